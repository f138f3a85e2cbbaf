//! # HTTP Retrieval Utilities
//!
//! A small asynchronous API client wrapper around `reqwest`, shared by all the
//! HTTP-backed source clients. It includes middleware support for exponential
//! backoff retries on transient failures and maps every failure into a
//! [`SourceError`] so the source caches can treat providers uniformly.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// bearer tokens, and automatic retries of transient failures.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` with a retry policy and a per-request timeout.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://api.example.com/v1/").
    /// * `auth_token` - An optional string for the Authorization header.
    /// * `max_retries` - Retries of transient failures (0 disables the middleware's retries).
    /// * `timeout` - Timeout of each individual HTTP attempt.
    ///
    /// # Errors
    /// Returns `SourceError::Network` if the base URL is not an absolute URL or the
    /// underlying client cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let url = Url::parse(base_url)
            .map_err(|e| SourceError::Network(format!("invalid base URL '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("DashboardHub/1.0")
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
        })
    }

    /// Performs a GET and deserializes the JSON body.
    ///
    /// # Arguments
    /// * `path` - The relative path to append to the base URL.
    /// * `query` - Query string pairs.
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, query).await
    }

    /// Performs a generic request and handles the response.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        // 1. Construct the full absolute URL
        let full_url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Network(format!("invalid path '{}': {}", path, e)))?;
        let mut req = self.inner.request(method, full_url).query(query);

        // 2. Inject Bearer Authentication if a token is present
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        // 3. Execute and classify
        let response = req.send().await.map_err(|e| SourceError::Network(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SourceError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, body))
    }
}

/// Maps a non-success status into the source error taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> SourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Auth(status.as_u16()),
        StatusCode::TOO_MANY_REQUESTS => SourceError::Quota,
        _ => SourceError::Http {
            status: status.as_u16(),
            body,
        },
    }
}

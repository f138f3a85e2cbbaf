//! # Data Retrieval Module
//!
//! Generic HTTP retrieval shared by the provider clients in `sources`. It keeps
//! request building, bearer authentication, transient retries and status
//! classification in one place, so each source client only deals with its own
//! payload shape.

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;

pub use ky_http::ApiClient;

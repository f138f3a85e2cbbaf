//! # Error Types
//!
//! Two error families exist in the engine. `SourceError` describes why a single
//! upstream fetch failed; it never travels past the aggregator. `HubError` is what
//! the control operations and the connection manager hand back to their callers.

use thiserror::Error;

use crate::core::connection_manager::ClientId;

/// Failure of one upstream source fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The request never completed (DNS, connect, TLS, reset...).
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Credentials were missing or rejected.
    #[error("upstream rejected credentials (HTTP {0})")]
    Auth(u16),

    /// The upstream quota or rate limit was hit.
    #[error("upstream quota exceeded")]
    Quota,

    /// The payload could not be mapped into a normalized record.
    #[error("could not decode upstream payload: {0}")]
    Decode(String),

    /// The fetch did not finish within the per-source timeout.
    #[error("fetch timed out after {0} ms")]
    Timeout(u128),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The source has no credentials or endpoint configured.
    #[error("source '{0}' is not configured")]
    NotConfigured(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// Errors surfaced by the hub's control operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// A view identifier outside the closed set was supplied to a strict entry point.
    #[error("invalid view '{0}', expected one of: personal, guest, briefing, weather, art")]
    InvalidView(String),

    /// Targeted delivery to a connection that is not in the live set.
    #[error("connection {0} not found")]
    ConnectionNotFound(ClientId),

    /// An inbound client payload could not be parsed.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A refresh cycle failed as a whole.
    #[error("refresh cycle failed: {0}")]
    CycleFailure(String),

    /// An outbound payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

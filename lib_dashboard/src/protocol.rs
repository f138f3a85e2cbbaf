//! # Wire Protocol
//!
//! Every message exchanged with a connection is an [`Envelope`]:
//! `{ "event": string, "data": object, "timestamp": RFC 3339 }`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Post-handshake welcome carrying the client id.
pub const EVENT_CONNECTION: &str = "connection";
/// Filtered snapshot pushed by a refresh cycle.
pub const EVENT_DASHBOARD_UPDATE: &str = "dashboard:update";
/// Error notification (malformed input or failed cycle).
pub const EVENT_ERROR: &str = "error";
/// Reply to an application-level ping.
pub const EVENT_PONG: &str = "pong";
/// Generic acknowledgment of any other client message.
pub const EVENT_ECHO: &str = "echo";

/// Outbound and inbound message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: Value,
    pub timestamp: String,
}

impl Envelope {
    /// Builds an envelope stamped with the current UTC time.
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Serializes `payload` into the data field.
    pub fn with_payload<T: Serialize>(event: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event, serde_json::to_value(payload)?))
    }

    /// `event=error` with `data.message` and an optional `data.error` detail.
    pub fn error(message: &str, detail: Option<String>) -> Self {
        let mut data = json!({ "message": message });
        if let Some(detail) = detail {
            data["error"] = Value::String(detail);
        }
        Self::new(EVENT_ERROR, data)
    }
}

/// Inbound client message. Only `type` is interpreted today.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ClientMessage {
    /// True for `{ "type": "ping" }`.
    pub fn is_ping(&self) -> bool {
        self.kind.as_deref() == Some("ping")
    }
}

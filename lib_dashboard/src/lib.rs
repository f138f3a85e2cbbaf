//! # lib_dashboard
//!
//! Live distribution engine of the dashboard hub. It pulls data from several
//! upstream sources through per-source TTL caches, merges it into one snapshot,
//! reshapes the snapshot for the current view and pushes it to every connected
//! WebSocket client.
//!
//! The binary crate only adds transport and routing on top of [`DashboardHub`].

#![forbid(unsafe_code)]

// Declare the modules
pub mod cache;
pub mod configs;
pub mod core;
pub mod error;
pub mod model;
pub mod protocol;
#[cfg(feature = "sources")]
pub mod retrieve;
pub mod sources;
pub mod views;

// Re-export the public surface
pub use crate::core::{
    ClientId, ConnectionManager, DashboardHub, HubStatus, Outbound, Scheduler, SnapshotAggregator,
    SnapshotResponse,
};
pub use cache::{CacheOutcome, SourceCache};
pub use configs::HubSettings;
pub use error::{HubError, SourceError};
pub use model::Snapshot;
pub use protocol::Envelope;
pub use views::{FilteredSnapshot, ViewId};

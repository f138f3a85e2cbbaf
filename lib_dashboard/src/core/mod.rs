//! # Core Module
//!
//! The live distribution engine.
//!
//! ## Contained Modules:
//! - **`connection_manager`**: live connection set, heartbeat, broadcast and targeted send.
//! - **`aggregator`**: concurrent source collection into one snapshot.
//! - **`scheduler`**: refresh timer, current view and on-demand cycles.
//! - **`hub`**: the facade exposing the control operations.

/// Connection lifecycle and fan-out.
pub mod connection_manager;
/// Snapshot assembly from the source caches.
pub mod aggregator;
/// Refresh cycles and the global view.
pub mod scheduler;
/// Control facade.
pub mod hub;

pub use aggregator::SnapshotAggregator;
pub use connection_manager::{ClientId, ConnectionManager, ConnectionState, Outbound};
pub use hub::{DashboardHub, HubStatus, SnapshotResponse};
pub use scheduler::Scheduler;

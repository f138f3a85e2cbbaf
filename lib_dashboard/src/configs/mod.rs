//! # Configuration
//!
//! Settings consumed by the hub. Loading them from files, environment and CLI
//! is the binary's job; this crate only defines the shape and the defaults.

/// Hub and source settings with built-in defaults.
pub mod settings;

pub use settings::{HubSettings, MIN_REFRESH_INTERVAL};

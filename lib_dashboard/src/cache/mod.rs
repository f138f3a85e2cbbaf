//! # Cache Module
//!
//! Per-source caching with bounded staleness and graceful degradation. Each
//! upstream source gets its own [`SourceCache`], created once at startup and
//! kept for the lifetime of the process.

/// TTL cache with stale-on-failure fallback.
pub mod source_cache;

pub use source_cache::{CacheOutcome, SourceCache};

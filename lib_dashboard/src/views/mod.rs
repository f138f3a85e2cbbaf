//! # Views Module
//!
//! The closed set of dashboard views and the pure filter that reshapes a full
//! snapshot for each of them.
//!
//! ## Contained Modules:
//! - **`view_id`**: the `ViewId` enumeration with strict and lenient parsing.
//! - **`filter`**: `filter`, `filter_with` and `filter_raw`, plus the per-view output shapes.
//! - **`quotes`**: the fixed quotation pool used by the guest and art views.

/// The enumerated view identifiers.
pub mod view_id;
/// Snapshot reshaping per view.
pub mod filter;
/// Quotation pool and uniform draw.
pub mod quotes;

// --- Public API Re-exports ---
pub use view_id::ViewId;
pub use filter::{filter, filter_raw, filter_with, FilterResult, FilteredSnapshot};

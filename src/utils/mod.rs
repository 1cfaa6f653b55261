//! Utility modules for the layout optimizer.
//!
//! - Error types
//! - Source location tracking
//! - Pipeline printing

pub mod errors;
pub mod location;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use location::{excerpt, SourceLocation, Span};
pub use pretty::{print_pipeline, PrettyPrint};

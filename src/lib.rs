//! # LayoutOpt - Data-Layout Auto-Tuning for Stage Pipelines
//!
//! Searches for storage layouts of a pipeline's input stages that reduce
//! the estimated memory-access cost of their consumers:
//! - Pipeline description language (frontend)
//! - Stage/pipeline IR with explicit loop orders
//! - Order-mismatch and reuse-distance cost models
//! - Layout transformations (interleave, reorder, split)
//! - Greedy search over transformations
//!
//! ## Architecture
//!
//! ```text
//! Source → Frontend → Pipeline → Cost Model ⇄ Search → Transformed Pipeline
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use layoutopt::prelude::*;
//!
//! let source = r#"
//!     func A(x, y) in [0, 511], [0, 31] = x + y;
//!     func out(x, y) in [0, 31], [0, 511] = A(y, x) + 1;
//!     output out;
//! "#;
//!
//! let pipeline = layoutopt::parse_pipeline(source)?;
//! let outcome = layoutopt::optimize(&pipeline, SearchConfig::default());
//! println!("{}", outcome.report());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod autotuning;
pub mod frontend;
pub mod ir;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::analysis::{layout_cost, BoundTable, CostBreakdown, CostModel, OrderBands};
    pub use crate::autotuning::{
        LayoutSearch, SearchConfig, SearchOutcome, SplitCostTracking, TransformKind,
        TransformRecord,
    };
    pub use crate::ir::{BinaryOp, Definition, Expr, Interval, Pipeline, ReductionVar, Stage};
    pub use crate::transform::{apply_transform, Interleave, LayoutTransform, Reorder, SplitY};
    pub use crate::utils::errors::*;
    pub use crate::utils::pretty::{print_pipeline, PrettyPrint};
}

use anyhow::Result;
use autotuning::{LayoutSearch, SearchConfig, SearchOutcome};
use ir::Pipeline;

/// Main entry point for parsing source code.
pub fn parse(source: &str) -> Result<frontend::ast::Program> {
    frontend::parse(source)
}

/// Parse and lower source code into a pipeline.
pub fn parse_pipeline(source: &str) -> Result<Pipeline> {
    frontend::parse_pipeline(source)
}

/// Search for a better layout of `pipeline`.
pub fn optimize(pipeline: &Pipeline, config: SearchConfig) -> SearchOutcome {
    LayoutSearch::new(config).run(pipeline)
}

/// Full pipeline: parse source and search for a better layout.
pub fn optimize_source(source: &str, config: SearchConfig) -> Result<SearchOutcome> {
    let pipeline = parse_pipeline(source)?;
    Ok(optimize(&pipeline, config))
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_optimize_source() {
        let source = "func A(x, y) in [0, 511], [0, 31] = x + y;
func out(x, y) in [0, 31], [0, 511] = A(y, x) + 1;
output out;";
        let outcome = optimize_source(source, SearchConfig::default()).unwrap();
        assert!(outcome.final_cost <= outcome.baseline_cost);
        assert!(!outcome.schedule.is_empty());
    }

    #[test]
    fn test_optimize_source_reports_errors() {
        assert!(optimize_source("func A(x) = ;", SearchConfig::default()).is_err());
    }
}

//! Analyses over pipeline snapshots: access patterns, bound estimates and
//! the layout cost model.

pub mod access;
pub mod bounds;
pub mod cost;

pub use access::AccessPattern;
pub use bounds::{BoundEstimator, BoundTable, DeclaredBounds};
pub use cost::{order_cost, use_distance, ConsumerCost, CostBreakdown, CostModel, OrderBands};

use crate::ir::Pipeline;

/// Layout cost of a pipeline under the default model.
pub fn layout_cost(pipeline: &Pipeline) -> f64 {
    CostModel::new().layout_cost(pipeline)
}

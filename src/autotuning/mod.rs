//! Layout Auto-Tuning
//!
//! Greedily searches for the data layout of a pipeline's leaf inputs that
//! minimizes the estimated memory-access cost.
//!
//! # Example
//!
//! ```ignore
//! use layoutopt::autotuning::{LayoutSearch, SearchConfig};
//!
//! let config = SearchConfig::default().max_rounds(16);
//! let outcome = LayoutSearch::new(config).run(&pipeline);
//! println!("{}", outcome.report());
//! ```

mod config;
mod results;
mod search;

pub use config::{
    SearchConfig, SplitCostTracking, ENV_DEBUG_DATA_TRANSFORM, ENV_USE_DATA_TRANSFORM,
};
pub use results::{RoundSummary, SearchOutcome};
pub use search::{LayoutSearch, SearchState};

pub use crate::transform::{TransformKind, TransformRecord};

use crate::ir::Pipeline;

/// Run the search with the toggles read from the environment.
pub fn optimize_from_env(pipeline: &Pipeline) -> SearchOutcome {
    LayoutSearch::new(SearchConfig::from_env()).run(pipeline)
}

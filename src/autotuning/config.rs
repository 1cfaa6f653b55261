//! Search configuration

use crate::transform::split::DEFAULT_SPLIT_FACTOR;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable enabling the layout search (value `True`).
pub const ENV_USE_DATA_TRANSFORM: &str = "LAYOUTOPT_USE_DATA_TRANSFORM";

/// Environment variable enabling progress messages (value `True`).
pub const ENV_DEBUG_DATA_TRANSFORM: &str = "LAYOUTOPT_DEBUG_DATA_TRANSFORM";

/// How a winning split candidate updates the running minimum of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitCostTracking {
    /// A split win lowers the running minimum like any other kind
    #[default]
    Consistent,
    /// A split win marks the round as improving and becomes the candidate,
    /// but leaves the running minimum where it was
    Reference,
}

impl fmt::Display for SplitCostTracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitCostTracking::Consistent => write!(f, "consistent"),
            SplitCostTracking::Reference => write!(f, "reference"),
        }
    }
}

impl FromStr for SplitCostTracking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "consistent" => Ok(SplitCostTracking::Consistent),
            "reference" => Ok(SplitCostTracking::Reference),
            other => Err(format!("unknown split tracking policy '{}'", other)),
        }
    }
}

/// Configuration for the layout search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Run the search at all; when off the input is returned unchanged
    pub enabled: bool,

    /// Emit progress messages at info level
    pub debug: bool,

    /// Upper bound on search rounds
    pub max_rounds: usize,

    /// Running-minimum policy for split candidates
    pub split_tracking: SplitCostTracking,

    /// Factor used by the split transformation
    pub split_factor: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            max_rounds: 64,
            split_tracking: SplitCostTracking::Consistent,
            split_factor: DEFAULT_SPLIT_FACTOR,
        }
    }
}

impl SearchConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the toggles from the environment.
    ///
    /// The search runs only when `LAYOUTOPT_USE_DATA_TRANSFORM` is exactly
    /// `True`; the same holds for `LAYOUTOPT_DEBUG_DATA_TRANSFORM`.
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag(ENV_USE_DATA_TRANSFORM),
            debug: env_flag(ENV_DEBUG_DATA_TRANSFORM),
            ..Self::default()
        }
    }

    /// Turn the search on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Log progress at info level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the round cap
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set the running-minimum policy for split candidates.
    pub fn split_tracking(mut self, tracking: SplitCostTracking) -> Self {
        self.split_tracking = tracking;
        self
    }

    /// Set the split factor.
    pub fn split_factor(mut self, factor: i64) -> Self {
        self.split_factor = factor;
        self
    }
}

fn env_flag(name: &str) -> bool {
    matches!(env::var(name).as_deref(), Ok("True"))
}

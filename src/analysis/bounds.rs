//! Bound estimates for stage dimensions and reduction variables.
//!
//! Cost models look ranges up by a qualified id: `"<stage>.<dim>"` for a
//! storage dimension, or the bare variable name for a reduction variable.

use crate::ir::{Interval, Pipeline};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive ranges keyed by qualified variable id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundTable {
    ranges: BTreeMap<String, Interval>,
}

impl BoundTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualified id of dimension `dim` of `stage`.
    pub fn dim_key(stage: &str, dim: usize) -> String {
        format!("{}.{}", stage, dim)
    }

    /// Record the range of `key`, replacing any earlier one.
    pub fn insert(&mut self, key: impl Into<String>, range: Interval) {
        self.ranges.insert(key.into(), range);
    }

    /// Range of `key`, if known.
    pub fn get(&self, key: &str) -> Option<Interval> {
        self.ranges.get(key).copied()
    }

    /// Whether `key` has a range.
    pub fn contains(&self, key: &str) -> bool {
        self.ranges.contains_key(key)
    }

    /// Extent of `key`. Callers guarantee coverage; an absent id reads as
    /// the default range `[0, 0]`.
    pub fn extent(&self, key: &str) -> i64 {
        match self.ranges.get(key) {
            Some(range) => range.extent(),
            None => {
                trace!("no bound estimate for '{}'", key);
                Interval::default().extent()
            }
        }
    }

    /// Extent of dimension `dim` of `stage`.
    pub fn dim_extent(&self, stage: &str, dim: usize) -> i64 {
        self.extent(&Self::dim_key(stage, dim))
    }

    /// Number of recorded ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no range is recorded.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Produces the bound table for a pipeline snapshot.
pub trait BoundEstimator: Send + Sync {
    /// Bound table of `pipeline`.
    fn estimate(&self, pipeline: &Pipeline) -> BoundTable;
}

/// Estimator reading the ranges each stage declares for its storage and
/// each update declares for its reduction domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredBounds;

impl BoundEstimator for DeclaredBounds {
    fn estimate(&self, pipeline: &Pipeline) -> BoundTable {
        let mut table = BoundTable::new();
        for stage in pipeline.stages() {
            for (dim, range) in stage.domain().iter().enumerate() {
                table.insert(BoundTable::dim_key(stage.name(), dim), *range);
            }
            for def in stage.definitions() {
                for rvar in def.reduction() {
                    table.insert(rvar.name.clone(), rvar.range);
                }
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Definition, Expr, ReductionVar, Stage};

    #[test]
    fn test_declared_bounds() {
        let input = Stage::pure(
            "in",
            &["x", "y"],
            vec![Interval::new(0, 511), Interval::new(0, 31)],
            Expr::var("x"),
        );
        let out = Stage::pure(
            "out",
            &["x"],
            vec![Interval::new(0, 511)],
            Expr::add(Expr::call("in", vec![Expr::var("x"), Expr::int(0)]), Expr::int(1)),
        )
        .with_update(Definition::with_reduction(
            vec!["r".into(), "x".into()],
            vec![Expr::add(
                Expr::call("out", vec![Expr::var("x")]),
                Expr::call("in", vec![Expr::var("x"), Expr::var("r")]),
            )],
            vec![ReductionVar::new("r", Interval::new(0, 31))],
        ));
        let pipeline = Pipeline::new(vec!["out".into()], vec![input, out]).unwrap();
        let table = DeclaredBounds.estimate(&pipeline);

        assert_eq!(table.get("in.0"), Some(Interval::new(0, 511)));
        assert_eq!(table.dim_extent("in", 1), 32);
        assert_eq!(table.extent("r"), 32);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_missing_entry_defaults() {
        let table = BoundTable::new();
        assert_eq!(table.extent("ghost.0"), 1);
    }
}

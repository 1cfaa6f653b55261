//! Memory-access cost model for data layouts.
//!
//! The cost of a pipeline is the sum, over every consumer of every leaf
//! input, of two penalties:
//!
//! - **order mismatch**: the consumer's innermost loop does not walk the
//!   producer's first storage dimension. The penalty per iteration grows
//!   with the size of the producer's fastest-varying block.
//! - **reuse distance**: the number of producer elements swept between two
//!   consecutive accesses along the consumer's innermost loop.
//!
//! Loop orders are read innermost first.

use crate::analysis::access::AccessPattern;
use crate::analysis::bounds::{BoundEstimator, BoundTable, DeclaredBounds};
use crate::ir::{Definition, Pipeline};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// Starting value of a non-zero reuse distance.
pub const REUSE_DISTANCE_BASE: f64 = 0.1;

/// Size bands of the fastest-varying block of a misordered producer and
/// the per-iteration penalty each band carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBands {
    /// Lower bound (inclusive) of the first band, then the upper bounds
    /// (inclusive) of the first and second bands.
    pub thresholds: [i64; 3],
    /// Penalty per iteration for each band, increasing.
    pub penalties: [f64; 3],
}

impl Default for OrderBands {
    fn default() -> Self {
        Self {
            thresholds: [512 * 32, 512 * 32 * 2, 512 * 32 * 32],
            penalties: [0.000_007_5, 0.000_095, 0.000_395],
        }
    }
}

impl OrderBands {
    /// Penalty for a block of `extent` elements, or `None` below the
    /// first band.
    pub fn penalty(&self, extent: i64) -> Option<f64> {
        let [low, mid, high] = self.thresholds;
        if extent > high {
            Some(self.penalties[2])
        } else if extent > mid {
            Some(self.penalties[1])
        } else if extent >= low {
            Some(self.penalties[0])
        } else {
            None
        }
    }
}

/// Order-mismatch cost of `def` (owned by stage `consumer`) reading
/// `target`.
pub fn order_cost(
    def: &Definition,
    consumer: &str,
    target: &str,
    bounds: &BoundTable,
    bands: &OrderBands,
) -> f64 {
    let pattern = AccessPattern::collect(def, target);
    if !pattern.is_misordered() {
        return 0.0;
    }

    // Saturates so huge domains land in the top band.
    let fastest = bounds
        .dim_extent(target, 0)
        .saturating_mul(bounds.dim_extent(target, 1));
    let Some(penalty) = bands.penalty(fastest) else {
        trace!("{} reads {} misordered, block {} below first band", consumer, target, fastest);
        return 0.0;
    };

    penalty * iteration_count(def, consumer, bounds)
}

/// Product of the extents of every loop of `def`.
///
/// Reduction variables are looked up by name; pure loop variables by the
/// consumer's dimension index, which skips the reduction loops seen so far.
fn iteration_count(def: &Definition, consumer: &str, bounds: &BoundTable) -> f64 {
    let mut offset = 0;
    let mut count = 1.0;
    for (i, var) in def.loop_vars().into_iter().enumerate() {
        let extent = if bounds.contains(var) {
            offset += 1;
            bounds.extent(var)
        } else {
            bounds.dim_extent(consumer, i - offset)
        };
        count *= extent as f64;
    }
    count
}

/// Reuse-distance cost of `def` reading `target`.
pub fn use_distance(def: &Definition, target: &str, bounds: &BoundTable) -> f64 {
    let Some(fastest) = def.innermost() else {
        return 0.0;
    };
    let pattern = AccessPattern::collect(def, target);

    match pattern.first_position_of(fastest) {
        None => {
            warn!("loop variable '{}' does not index '{}'", fastest, target);
            0.0
        }
        Some(0) => 0.0,
        Some(idx) => (0..idx).fold(REUSE_DISTANCE_BASE, |cost, dim| {
            cost * bounds.dim_extent(target, dim) as f64
        }),
    }
}

/// Cost contribution of one consumer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerCost {
    /// Leaf input being read.
    pub producer: String,
    /// Stage owning the reading definition.
    pub consumer: String,
    /// Order-mismatch penalty.
    pub order: f64,
    /// Reuse-distance penalty.
    pub distance: f64,
}

impl ConsumerCost {
    /// Sum of both penalties.
    pub fn total(&self) -> f64 {
        self.order + self.distance
    }
}

/// Itemized layout cost of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// One entry per consumer definition of each leaf input.
    pub entries: Vec<ConsumerCost>,
}

impl CostBreakdown {
    /// Total cost over all entries.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(ConsumerCost::total).sum()
    }
}

/// Scores whole pipeline snapshots.
pub struct CostModel {
    bands: OrderBands,
    estimator: Box<dyn BoundEstimator>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CostModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostModel").field("bands", &self.bands).finish()
    }
}

impl CostModel {
    /// Default bands over declared stage bounds.
    pub fn new() -> Self {
        Self {
            bands: OrderBands::default(),
            estimator: Box::new(DeclaredBounds),
        }
    }

    /// Use `bands` for the order-mismatch penalty.
    pub fn with_bands(mut self, bands: OrderBands) -> Self {
        self.bands = bands;
        self
    }

    /// Estimate bounds with `estimator`.
    pub fn with_estimator(mut self, estimator: impl BoundEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    /// Bands used by the order-mismatch penalty.
    pub fn bands(&self) -> &OrderBands {
        &self.bands
    }

    /// Bound table of a pipeline snapshot.
    pub fn bounds(&self, pipeline: &Pipeline) -> BoundTable {
        self.estimator.estimate(pipeline)
    }

    /// Per-consumer costs of every leaf input.
    pub fn breakdown(&self, pipeline: &Pipeline) -> CostBreakdown {
        let bounds = self.bounds(pipeline);
        let mut entries = Vec::new();
        for producer in pipeline.leaf_inputs() {
            for (def, consumer) in pipeline.consumers_of(&producer) {
                let order = order_cost(def, consumer, &producer, &bounds, &self.bands);
                let distance = use_distance(def, &producer, &bounds);
                trace!(
                    "{} -> {}: order {:.6}, distance {:.6}",
                    producer, consumer, order, distance
                );
                entries.push(ConsumerCost {
                    producer: producer.clone(),
                    consumer: consumer.to_string(),
                    order,
                    distance,
                });
            }
        }
        CostBreakdown { entries }
    }

    /// Total layout cost; the objective the search minimizes.
    pub fn layout_cost(&self, pipeline: &Pipeline) -> f64 {
        self.breakdown(pipeline).total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, Interval, ReductionVar, Stage};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    fn table(entries: &[(&str, i64, i64)]) -> BoundTable {
        let mut t = BoundTable::new();
        for (k, lo, hi) in entries {
            t.insert(*k, Interval::new(*lo, *hi));
        }
        t
    }

    #[test]
    fn test_band_boundaries() {
        let bands = OrderBands::default();
        assert_eq!(bands.penalty(16383), None);
        assert_eq!(bands.penalty(16384), Some(0.000_007_5));
        assert_eq!(bands.penalty(32768), Some(0.000_007_5));
        assert_eq!(bands.penalty(32769), Some(0.000_095));
        assert_eq!(bands.penalty(524_288), Some(0.000_095));
        assert_eq!(bands.penalty(524_289), Some(0.000_395));
    }

    #[test]
    fn test_order_cost_first_band() {
        // Loops listed innermost first: x is the fastest loop.
        // consumer(x, y) = target(y, x) + 1, target is 512 x 32.
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::add(
                Expr::call("target", vec![Expr::var("y"), Expr::var("x")]),
                Expr::int(1),
            )],
        );
        let bounds = table(&[
            ("target.0", 0, 511),
            ("target.1", 0, 31),
            ("consumer.0", 0, 31),
            ("consumer.1", 0, 511),
        ]);
        let cost = order_cost(&def, "consumer", "target", &bounds, &OrderBands::default());
        assert!(close(cost, 0.000_007_5 * 32.0 * 512.0));
    }

    #[test]
    fn test_order_cost_huge_block_top_band() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::add(
                Expr::call("t", vec![Expr::var("y"), Expr::var("x")]),
                Expr::int(1),
            )],
        );
        let bounds = table(&[
            ("t.0", 0, 3_999_999_999),
            ("t.1", 0, 3_999_999_999),
            ("c.0", 0, 1),
            ("c.1", 0, 1),
        ]);
        let cost = order_cost(&def, "c", "t", &bounds, &OrderBands::default());
        assert!(close(cost, 0.000_395 * 4.0));
    }

    #[test]
    fn test_order_cost_zero_without_misorder() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::call("target", vec![Expr::var("x"), Expr::var("y")])],
        );
        let bounds = table(&[("target.0", 0, 4095), ("target.1", 0, 4095)]);
        assert_eq!(order_cost(&def, "c", "target", &bounds, &OrderBands::default()), 0.0);
    }

    #[test]
    fn test_order_cost_reduction_loops() {
        // out(x, y) += a(x, k) over k: loops k, x, y
        let def = Definition::with_reduction(
            vec!["k".into(), "x".into(), "y".into()],
            vec![Expr::add(
                Expr::call("out", vec![Expr::var("x"), Expr::var("y")]),
                Expr::call("a", vec![Expr::var("x"), Expr::var("k")]),
            )],
            vec![ReductionVar::new("k", Interval::new(0, 63))],
        );
        let bounds = table(&[
            ("a.0", 0, 1023),
            ("a.1", 0, 63),
            ("k", 0, 63),
            ("out.0", 0, 9),
            ("out.1", 0, 19),
        ]);
        // block 1024 * 64 = 65536 -> second band; loops 64 * 10 * 20
        let cost = order_cost(&def, "out", "a", &bounds, &OrderBands::default());
        assert!(close(cost, 0.000_095 * 64.0 * 10.0 * 20.0));
    }

    #[test]
    fn test_use_distance() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::mul(
                Expr::call("t", vec![Expr::var("y"), Expr::int(0), Expr::var("x")]),
                Expr::int(2),
            )],
        );
        let bounds = table(&[("t.0", 0, 9), ("t.1", 0, 3), ("t.2", 0, 99)]);
        assert!(close(use_distance(&def, "t", &bounds), 0.1 * 10.0 * 4.0));
    }

    #[test]
    fn test_use_distance_zero_at_first_position() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::call("t", vec![Expr::var("x"), Expr::var("y")])],
        );
        let bounds = table(&[("t.0", 0, 9), ("t.1", 0, 9)]);
        assert_eq!(use_distance(&def, "t", &bounds), 0.0);
    }

    #[test]
    fn test_use_distance_missing_var() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::call("t", vec![Expr::var("y"), Expr::int(3)])],
        );
        assert_eq!(use_distance(&def, "t", &BoundTable::new()), 0.0);
    }

    #[test]
    fn test_layout_cost_sums_consumers() {
        let dom = vec![Interval::new(0, 511), Interval::new(0, 31)];
        let input = Stage::pure("in", &["x", "y"], dom.clone(), Expr::var("x"));
        let good = Stage::pure(
            "good",
            &["x", "y"],
            dom.clone(),
            Expr::add(Expr::call("in", vec![Expr::var("x"), Expr::var("y")]), Expr::int(1)),
        );
        let bad = Stage::pure(
            "bad",
            &["y", "x"],
            vec![Interval::new(0, 31), Interval::new(0, 511)],
            Expr::add(Expr::call("in", vec![Expr::var("x"), Expr::var("y")]), Expr::int(1)),
        );
        let out = Stage::pure(
            "out",
            &["x", "y"],
            dom,
            Expr::add(
                Expr::call("good", vec![Expr::var("x"), Expr::var("y")]),
                Expr::call("bad", vec![Expr::var("y"), Expr::var("x")]),
            ),
        );
        let pipeline = Pipeline::new(vec!["out".into()], vec![input, good, bad, out]).unwrap();
        let model = CostModel::new();
        let breakdown = model.breakdown(&pipeline);

        assert_eq!(breakdown.entries.len(), 2);
        let bad_entry = breakdown.entries.iter().find(|e| e.consumer == "bad").unwrap();
        // bad loops y fastest but reads in(x, y)
        assert!(close(bad_entry.order, 0.000_007_5 * 32.0 * 512.0));
        assert!(close(bad_entry.distance, 0.1 * 512.0));
        assert!(close(model.layout_cost(&pipeline), bad_entry.total()));
    }
}

//! Stages and their definitions.

use crate::ir::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker appended to every loop order; never a real loop.
pub const OUTERMOST: &str = "__outermost";

/// An inclusive integer range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound.
    pub min: i64,
    /// Upper bound, inclusive.
    pub max: i64,
}

impl Interval {
    /// Range `[min, max]`.
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Number of points in the range (`max - min + 1`), saturating at
    /// `i64::MAX`.
    pub fn extent(&self) -> i64 {
        self.max.saturating_sub(self.min).saturating_add(1)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// A variable of a reduction domain with its iteration range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionVar {
    /// Variable name.
    pub name: String,
    /// Iteration range.
    pub range: Interval,
}

impl ReductionVar {
    /// Reduction variable `name` over `range`.
    pub fn new(name: impl Into<String>, range: Interval) -> Self {
        Self { name: name.into(), range }
    }
}

/// One rule computing a stage's value.
///
/// The loop order is stored innermost first: index 0 is the
/// fastest-varying loop. [`OUTERMOST`] always terminates the list.
/// A definition is never edited in place; transformations build a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    loop_order: Vec<String>,
    values: Vec<Expr>,
    reduction: Vec<ReductionVar>,
}

impl Definition {
    /// Create a pure definition iterating `loop_vars` (innermost first).
    pub fn new(loop_vars: Vec<String>, values: Vec<Expr>) -> Self {
        Self::with_reduction(loop_vars, values, Vec::new())
    }

    /// Create a definition over a reduction domain.
    pub fn with_reduction(
        loop_vars: Vec<String>,
        values: Vec<Expr>,
        reduction: Vec<ReductionVar>,
    ) -> Self {
        let mut loop_order: Vec<String> = loop_vars
            .into_iter()
            .filter(|v| !is_outermost(v))
            .collect();
        loop_order.push(OUTERMOST.to_string());
        Self {
            loop_order,
            values,
            reduction,
        }
    }

    /// The full stored loop order, including the trailing sentinel.
    pub fn loop_order(&self) -> &[String] {
        &self.loop_order
    }

    /// Loop variables with the sentinel removed, innermost first.
    pub fn loop_vars(&self) -> Vec<&str> {
        self.loop_order
            .iter()
            .filter(|v| !is_outermost(v))
            .map(String::as_str)
            .collect()
    }

    /// The fastest-varying loop variable, if the definition loops at all.
    pub fn innermost(&self) -> Option<&str> {
        self.loop_vars().into_iter().next()
    }

    /// Right-hand-side expressions.
    pub fn values(&self) -> &[Expr] {
        &self.values
    }

    /// Reduction variables of this definition (empty for pure ones).
    pub fn reduction(&self) -> &[ReductionVar] {
        &self.reduction
    }

    /// Whether the definition has a reduction domain.
    pub fn is_update(&self) -> bool {
        !self.reduction.is_empty()
    }

    /// Whether any right-hand side reads `name`.
    pub fn calls(&self, name: &str) -> bool {
        self.values
            .iter()
            .any(|v| v.called_names().into_iter().any(|n| n == name))
    }

    /// Build a new definition with the same loops and reduction domain but
    /// different right-hand sides.
    pub fn with_values(&self, values: Vec<Expr>) -> Self {
        Self {
            loop_order: self.loop_order.clone(),
            values,
            reduction: self.reduction.clone(),
        }
    }
}

fn is_outermost(var: &str) -> bool {
    var.ends_with(OUTERMOST)
}

/// A named array-producing computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    name: String,
    args: Vec<String>,
    domain: Vec<Interval>,
    definitions: Vec<Definition>,
}

impl Stage {
    /// Create a stage from its base definition.
    ///
    /// `domain` holds one storage range per pure argument.
    pub fn new(
        name: impl Into<String>,
        args: Vec<String>,
        domain: Vec<Interval>,
        base: Definition,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            domain,
            definitions: vec![base],
        }
    }

    /// Convenience constructor: a pure stage looping over its arguments in
    /// declaration order.
    pub fn pure(
        name: impl Into<String>,
        args: &[&str],
        domain: Vec<Interval>,
        value: Expr,
    ) -> Self {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let base = Definition::new(args.clone(), vec![value]);
        Self::new(name, args, domain, base)
    }

    /// Append an update definition.
    pub fn push_update(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    /// Builder form of [`Stage::push_update`].
    pub fn with_update(mut self, definition: Definition) -> Self {
        self.push_update(definition);
        self
    }

    /// Stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pure argument names in storage order (dimension 0 first).
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Declared storage range of every dimension.
    pub fn domain(&self) -> &[Interval] {
        &self.domain
    }

    /// Number of storage dimensions.
    pub fn dimensions(&self) -> usize {
        self.args.len()
    }

    /// Base definition followed by updates; never empty.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub(crate) fn definitions_mut(&mut self) -> &mut Vec<Definition> {
        &mut self.definitions
    }

    /// Names of other stages or buffers read by any definition.
    /// Self-reads of update definitions are excluded.
    pub fn callees(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for def in &self.definitions {
            for value in def.values() {
                for name in value.called_names() {
                    if name != self.name && !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Whether any definition reads `name`.
    pub fn calls(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.calls(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_extent() {
        assert_eq!(Interval::new(0, 511).extent(), 512);
        assert_eq!(Interval::new(-2, 2).extent(), 5);
        assert_eq!(Interval::default().extent(), 1);
    }

    #[test]
    fn test_interval_extent_saturates() {
        assert_eq!(Interval::new(i64::MIN, i64::MAX).extent(), i64::MAX);
        assert_eq!(Interval::new(0, i64::MAX).extent(), i64::MAX);
    }

    #[test]
    fn test_loop_order_sentinel() {
        let def = Definition::new(vec!["x".into(), "y".into()], vec![Expr::int(0)]);
        assert_eq!(def.loop_order().last().map(String::as_str), Some(OUTERMOST));
        assert_eq!(def.loop_vars(), vec!["x", "y"]);
        assert_eq!(def.innermost(), Some("x"));
    }

    #[test]
    fn test_sentinel_not_duplicated() {
        let def = Definition::new(vec!["x".into(), OUTERMOST.into()], vec![Expr::int(0)]);
        assert_eq!(def.loop_order().len(), 2);
    }

    #[test]
    fn test_callees_skip_self() {
        let stage = Stage::pure(
            "h",
            &["x"],
            vec![Interval::new(0, 9)],
            Expr::call("in", vec![Expr::var("x")]),
        )
        .with_update(Definition::with_reduction(
            vec!["r".into(), "x".into()],
            vec![Expr::add(
                Expr::call("h", vec![Expr::var("x")]),
                Expr::call("w", vec![Expr::var("r")]),
            )],
            vec![ReductionVar::new("r", Interval::new(0, 3))],
        ));
        assert_eq!(stage.callees(), vec!["in", "w"]);
        assert!(stage.calls("h"));
        assert!(stage.definitions()[1].is_update());
    }
}

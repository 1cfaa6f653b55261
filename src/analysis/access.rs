//! Which loop variables index which argument of a producer.
//!
//! For a consumer definition and a producer name, [`AccessPattern`] walks
//! every right-hand side and records, per argument position of each call
//! to the producer, the consumer loop variables that appear there.

use crate::ir::{Call, Definition};
use std::collections::BTreeSet;

/// Loop-variable usage of one producer inside one consumer definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPattern {
    /// Union over all call sites: `positions[i]` holds the loop variables
    /// used in argument `i`.
    positions: Vec<BTreeSet<String>>,
    /// Per call site, in evaluation order.
    sites: Vec<Vec<BTreeSet<String>>>,
    innermost: Option<String>,
}

impl AccessPattern {
    /// Collect the accesses `def` makes to `target`.
    pub fn collect(def: &Definition, target: &str) -> Self {
        let loop_vars = def.loop_vars();
        let mut pattern = Self {
            innermost: loop_vars.first().map(|v| v.to_string()),
            ..Self::default()
        };
        for value in def.values() {
            value.for_each_call(&mut |call: &Call| {
                if call.name == target {
                    pattern.record(call, &loop_vars);
                }
            });
        }
        pattern
    }

    fn record(&mut self, call: &Call, loop_vars: &[&str]) {
        let mut site = Vec::with_capacity(call.args.len());
        for (i, arg) in call.args.iter().enumerate() {
            let used: BTreeSet<String> = loop_vars
                .iter()
                .filter(|name| arg.references_var(name))
                .map(|name| name.to_string())
                .collect();

            if self.positions.len() <= i {
                self.positions.resize_with(i + 1, BTreeSet::new);
            }
            self.positions[i].extend(used.iter().cloned());
            site.push(used);
        }
        self.sites.push(site);
    }

    /// Number of calls to the producer.
    pub fn call_count(&self) -> usize {
        self.sites.len()
    }

    /// Loop variables seen per argument position, merged over call sites.
    pub fn positions(&self) -> &[BTreeSet<String>] {
        &self.positions
    }

    /// First argument position whose variables include `var`.
    pub fn first_position_of(&self, var: &str) -> Option<usize> {
        self.positions.iter().position(|vars| vars.contains(var))
    }

    /// True when some call site does not index the producer's first
    /// storage dimension with the consumer's innermost loop variable.
    pub fn is_misordered(&self) -> bool {
        let Some(innermost) = self.innermost.as_deref() else {
            return false;
        };
        self.sites.iter().any(|site| match site.first() {
            Some(first) => !first.contains(innermost),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Expr;

    fn gemm_def() -> Definition {
        // out(x, y) += a(k, y) * b(x, k), loops k, x, y
        Definition::new(
            vec!["k".into(), "x".into(), "y".into()],
            vec![Expr::mul(
                Expr::call("a", vec![Expr::var("k"), Expr::var("y")]),
                Expr::call("b", vec![Expr::var("x"), Expr::var("k")]),
            )],
        )
    }

    #[test]
    fn test_positions() {
        let p = AccessPattern::collect(&gemm_def(), "b");
        assert_eq!(p.call_count(), 1);
        assert!(p.positions()[0].contains("x"));
        assert!(p.positions()[1].contains("k"));
        assert_eq!(p.first_position_of("k"), Some(1));
    }

    #[test]
    fn test_misorder() {
        // innermost is k; a(k, y) is fine, b(x, k) is not
        assert!(!AccessPattern::collect(&gemm_def(), "a").is_misordered());
        assert!(AccessPattern::collect(&gemm_def(), "b").is_misordered());
    }

    #[test]
    fn test_compound_index() {
        let def = Definition::new(
            vec!["x".into(), "y".into()],
            vec![Expr::add(
                Expr::call("a", vec![Expr::add(Expr::var("x"), Expr::int(1)), Expr::var("y")]),
                Expr::call("a", vec![Expr::var("y"), Expr::var("x")]),
            )],
        );
        let p = AccessPattern::collect(&def, "a");
        assert_eq!(p.call_count(), 2);
        // the second site reads a(y, x)
        assert!(p.is_misordered());
        assert_eq!(p.first_position_of("x"), Some(0));
    }

    #[test]
    fn test_absent_target() {
        let p = AccessPattern::collect(&gemm_def(), "zzz");
        assert_eq!(p.call_count(), 0);
        assert!(!p.is_misordered());
        assert_eq!(p.first_position_of("k"), None);
    }
}

//! Call-site rewriting.
//!
//! [`CallRewriter`] redirects reads of a target stage to a replacement
//! stage, remapping the coordinates with an argument-rewrite policy.
//! Only calls that are a direct operand of an arithmetic node are
//! redirected; a call at the root of a right-hand side or used directly
//! as another call's argument is left as is.

use crate::ir::{Definition, Expr, Stage};
use std::cell::Cell;

/// Rewrites calls to `target` into calls to `replacement`.
pub struct CallRewriter<'a, F>
where
    F: Fn(&mut Vec<Expr>),
{
    target: &'a str,
    replacement: &'a str,
    rewrite_args: F,
    rewritten: Cell<usize>,
}

impl<'a, F> CallRewriter<'a, F>
where
    F: Fn(&mut Vec<Expr>),
{
    /// Rewriter redirecting `target` to `replacement`.
    pub fn new(target: &'a str, replacement: &'a str, rewrite_args: F) -> Self {
        Self {
            target,
            replacement,
            rewrite_args,
            rewritten: Cell::new(0),
        }
    }

    /// Number of call sites redirected so far.
    pub fn rewritten(&self) -> usize {
        self.rewritten.get()
    }

    /// Rewrite an expression bottom-up, returning the new tree.
    pub fn rewrite(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Binary { op, left, right } => {
                let left = self.redirect(self.rewrite(left));
                let right = self.redirect(self.rewrite(right));
                Expr::binary(*op, left, right)
            }
            Expr::Call(call) => Expr::call(
                call.name.clone(),
                call.args.iter().map(|arg| self.rewrite(arg)).collect(),
            ),
            Expr::Int(_) | Expr::Float(_) | Expr::Var(_) => expr.clone(),
        }
    }

    /// Redirect an arithmetic operand if it reads the target.
    fn redirect(&self, operand: Expr) -> Expr {
        match operand {
            Expr::Call(call) if call.name == self.target => {
                let mut args = call.args;
                (self.rewrite_args)(&mut args);
                self.rewritten.set(self.rewritten.get() + 1);
                Expr::call(self.replacement, args)
            }
            other => other,
        }
    }

    /// Rewrite every value of `def`.
    pub fn rewrite_definition(&self, def: &Definition) -> Definition {
        def.with_values(def.values().iter().map(|v| self.rewrite(v)).collect())
    }

    /// Replace every definition of `stage` with its rewritten form.
    /// The target's own definitions are never touched.
    pub fn rewrite_stage(&self, stage: &mut Stage) {
        if stage.name() == self.target {
            return;
        }
        let definitions: Vec<Definition> = stage
            .definitions()
            .iter()
            .map(|def| self.rewrite_definition(def))
            .collect();
        *stage.definitions_mut() = definitions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Interval, Stage};

    fn swap(args: &mut Vec<Expr>) {
        args.swap(0, 1);
    }

    fn t(a: &str, b: &str) -> Expr {
        Expr::call("t", vec![Expr::var(a), Expr::var(b)])
    }

    #[test]
    fn test_rewrites_arithmetic_operands() {
        let rw = CallRewriter::new("t", "t2", swap);
        let e = Expr::add(t("x", "y"), Expr::mul(Expr::int(2), t("y", "x")));
        let out = rw.rewrite(&e);
        assert_eq!(out.to_string(), "t2(y, x) + 2 * t2(x, y)");
        assert_eq!(rw.rewritten(), 2);
    }

    #[test]
    fn test_root_call_untouched() {
        let rw = CallRewriter::new("t", "t2", swap);
        let e = t("x", "y");
        assert_eq!(rw.rewrite(&e), e);
        assert_eq!(rw.rewritten(), 0);
    }

    #[test]
    fn test_direct_call_argument_untouched() {
        let rw = CallRewriter::new("t", "t2", swap);
        // u(t(x, y)) + 1: the read of t is a call argument, not an operand
        let e = Expr::add(Expr::call("u", vec![t("x", "y")]), Expr::int(1));
        assert_eq!(rw.rewrite(&e), e);
    }

    #[test]
    fn test_nested_occurrence_in_call_argument() {
        let rw = CallRewriter::new("t", "t2", swap);
        // u(t(x, y) + 1) * t(x, y)
        let e = Expr::mul(
            Expr::call("u", vec![Expr::add(t("x", "y"), Expr::int(1))]),
            t("x", "y"),
        );
        assert_eq!(rw.rewrite(&e).to_string(), "u(t2(y, x) + 1) * t2(y, x)");
    }

    #[test]
    fn test_nested_target_inside_target_args() {
        let rw = CallRewriter::new("t", "t2", swap);
        // t(t(x, y) + 1, y) - 1
        let e = Expr::sub(
            Expr::call("t", vec![Expr::add(t("x", "y"), Expr::int(1)), Expr::var("y")]),
            Expr::int(1),
        );
        assert_eq!(rw.rewrite(&e).to_string(), "t2(y, t2(y, x) + 1) - 1");
    }

    #[test]
    fn test_rewrite_stage_skips_target() {
        let rw = CallRewriter::new("t", "t2", swap);
        let mut stage = Stage::pure(
            "t",
            &["x", "y"],
            vec![Interval::new(0, 1), Interval::new(0, 1)],
            Expr::add(t("x", "y"), Expr::int(1)),
        );
        let before = stage.clone();
        rw.rewrite_stage(&mut stage);
        assert_eq!(stage, before);
    }
}

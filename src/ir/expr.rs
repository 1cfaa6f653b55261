//! Right-hand-side expressions of stage definitions.
//!
//! Expressions are owned trees: arithmetic nodes over leaves, where a
//! [`Call`] reads another stage (or an external buffer) at a coordinate.
//! Transformations never mutate a shared node; they build a new tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four arithmetic operators a definition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Integer division.
    Div,
}

impl BinaryOp {
    /// Operator symbol as written in the pipeline language.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }
}

/// A read of a stage at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Name of the stage (or external buffer) being read
    pub name: String,
    /// Coordinate expressions, one per storage dimension
    pub args: Vec<Expr>,
}

impl Call {
    /// Call of `name` with `args`.
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self { name: name.into(), args }
    }
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Loop or reduction variable
    Var(String),
    /// Arithmetic node
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Read of another stage
    Call(Call),
}

impl Expr {
    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    /// Variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Read of stage `name` at `args`.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(Call::new(name, args))
    }

    /// Binary node.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left + right`
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    /// `left - right`
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    /// `left * right`
    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    /// `left / right`
    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    /// Visit every call in evaluation order (left before right, a call
    /// before the calls nested in its arguments).
    pub fn for_each_call<'a, F: FnMut(&'a Call)>(&'a self, f: &mut F) {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Var(_) => {}
            Expr::Binary { left, right, .. } => {
                left.for_each_call(f);
                right.for_each_call(f);
            }
            Expr::Call(call) => {
                f(call);
                for arg in &call.args {
                    arg.for_each_call(f);
                }
            }
        }
    }

    /// Names of all calls in this expression, in evaluation order.
    pub fn called_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.for_each_call(&mut |call| names.push(call.name.as_str()));
        names
    }

    /// Whether `name` occurs as a variable anywhere in the tree.
    pub fn references_var(&self, name: &str) -> bool {
        match self {
            Expr::Var(v) => v == name,
            Expr::Int(_) | Expr::Float(_) => false,
            Expr::Binary { left, right, .. } => {
                left.references_var(name) || right.references_var(name)
            }
            Expr::Call(call) => call.args.iter().any(|a| a.references_var(name)),
        }
    }

    /// Replace every occurrence of variable `name` with `replacement`.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        match self {
            Expr::Var(v) if v == name => replacement.clone(),
            Expr::Int(_) | Expr::Float(_) | Expr::Var(_) => self.clone(),
            Expr::Binary { op, left, right } => Expr::binary(
                *op,
                left.substitute(name, replacement),
                right.substitute(name, replacement),
            ),
            Expr::Call(call) => Expr::call(
                call.name.clone(),
                call.args
                    .iter()
                    .map(|a| a.substitute(name, replacement))
                    .collect(),
            ),
        }
    }

    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                let needs_parens = prec < parent;
                if needs_parens {
                    write!(f, "(")?;
                }
                left.fmt_with_precedence(f, prec)?;
                write!(f, " {} ", op.symbol())?;
                // Left-associative: a right operand of equal precedence
                // must keep its parentheses.
                right.fmt_with_precedence(f, prec + 1)?;
                if needs_parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Expr {
        // A(x, y) * B(k, A(y, x) + 1)
        Expr::mul(
            Expr::call("A", vec![Expr::var("x"), Expr::var("y")]),
            Expr::call(
                "B",
                vec![
                    Expr::var("k"),
                    Expr::add(
                        Expr::call("A", vec![Expr::var("y"), Expr::var("x")]),
                        Expr::int(1),
                    ),
                ],
            ),
        )
    }

    #[test]
    fn test_called_names_in_evaluation_order() {
        assert_eq!(sample().called_names(), vec!["A", "B", "A"]);
    }

    #[test]
    fn test_references_var() {
        let e = sample();
        assert!(e.references_var("k"));
        assert!(!e.references_var("z"));
    }

    #[test]
    fn test_substitute() {
        let e = Expr::add(Expr::var("y"), Expr::call("A", vec![Expr::var("y")]));
        let s = e.substitute("y", &Expr::int(3));
        assert_eq!(s.to_string(), "3 + A(3)");
    }

    #[test]
    fn test_display_parenthesizes() {
        let e = Expr::mul(Expr::add(Expr::var("a"), Expr::var("b")), Expr::var("c"));
        assert_eq!(e.to_string(), "(a + b) * c");

        let e = Expr::sub(Expr::var("a"), Expr::sub(Expr::var("b"), Expr::var("c")));
        assert_eq!(e.to_string(), "a - (b - c)");

        let e = Expr::sub(Expr::var("y"), Expr::mul(Expr::div(Expr::var("y"), Expr::int(2)), Expr::int(2)));
        assert_eq!(e.to_string(), "y - y / 2 * 2");
    }
}

//! Abstract Syntax Tree (AST) for the pipeline description language.
//!
//! The AST keeps source spans so lowering can report errors at the
//! offending name or expression.

use crate::ir::BinaryOp;
use crate::utils::location::Span;
use serde::{Deserialize, Serialize};

/// A parsed source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    /// Declarations in source order
    pub items: Vec<Item>,
    /// Source span
    pub span: Span,
}

impl Program {
    /// Empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage declarations, in source order.
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Func(func) => Some(func),
            _ => None,
        })
    }

    /// Find a stage declaration by name.
    pub fn find_func(&self, name: &str) -> Option<&FuncDecl> {
        self.funcs().find(|f| f.name.name == name)
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// A stage and its base definition.
    Func(FuncDecl),
    /// An update definition.
    Update(UpdateDecl),
    /// The output list.
    Output(OutputDecl),
}

/// A name with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    /// The name as written.
    pub name: String,
    /// Where it was written.
    pub span: Span,
}

/// An inclusive range literal `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeLit {
    /// Lower bound.
    pub min: i64,
    /// Upper bound, inclusive.
    pub max: i64,
    /// Source span.
    pub span: Span,
}

/// `func NAME(args) in ranges [order vars] = values;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Stage name
    pub name: Ident,
    /// Pure arguments, storage order
    pub args: Vec<Ident>,
    /// One storage range per argument
    pub domain: Vec<RangeLit>,
    /// Loop order, innermost first; defaults to `args`
    pub order: Option<Vec<Ident>>,
    /// Right-hand sides
    pub values: Vec<Expr>,
    /// Source span
    pub span: Span,
}

/// `update NAME [reduce r in range, ..] [order vars] = values;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDecl {
    /// Stage being updated
    pub name: Ident,
    /// Reduction domain
    pub reduction: Vec<ReduceVar>,
    /// Loop order, innermost first; defaults to reduction variables then
    /// the stage's arguments
    pub order: Option<Vec<Ident>>,
    /// Right-hand sides
    pub values: Vec<Expr>,
    /// Source span
    pub span: Span,
}

/// A reduction variable with its range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceVar {
    /// Variable name.
    pub name: Ident,
    /// Iteration range.
    pub range: RangeLit,
}

/// `output a, b;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDecl {
    /// Output stage names.
    pub names: Vec<Ident>,
    /// Source span.
    pub span: Span,
}

/// An expression with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// What the expression is.
    pub kind: ExprKind,
    /// Source span.
    pub span: Span,
}

impl Expr {
    /// Expression of `kind` at `span`.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Variable reference
    Var(String),
    /// Unary minus
    Neg(Box<Expr>),
    /// Binary arithmetic
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Read of a stage
    Call { name: String, args: Vec<Expr> },
    /// Parenthesized expression
    Grouped(Box<Expr>),
}

//! Intermediate representation of a stage pipeline.
//!
//! - `expr`: owned expression trees with calls between stages
//! - `stage`: stages, definitions, loop orders and storage domains
//! - `pipeline`: the graph of stages reachable from the outputs

pub mod expr;
pub mod stage;
pub mod pipeline;

pub use expr::{BinaryOp, Call, Expr};
pub use stage::{Definition, Interval, ReductionVar, Stage, OUTERMOST};
pub use pipeline::Pipeline;

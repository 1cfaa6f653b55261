//! Frontend: lexer, parser and lowering for the pipeline language.
//!
//! ## Language Overview
//!
//! A source file declares stages, their update definitions and the
//! pipeline outputs:
//!
//! ```text
//! // 512 x 32 input, read transposed below
//! func A(x, y) in [0, 511], [0, 31] = x + y;
//! func out(x, y) in [0, 31], [0, 511] order x, y = A(y, x) + 1;
//! update out reduce r in [0, 3] order r, x, y = out(x, y) + A(y, r);
//! output out;
//! ```
//!
//! Every stage argument gets an inclusive storage range. `order` lists the
//! loop variables innermost first; without it a stage loops over its
//! arguments in declaration order and an update over its reduction
//! variables, then the stage's arguments.

pub mod ast;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use lower::lower;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use crate::ir::Pipeline;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse source code into an AST.
pub fn parse(source: &str) -> Result<ast::Program> {
    let mut parser = Parser::new(Lexer::new(source))?;
    Ok(parser.parse_program()?)
}

/// Parse and lower source code into a pipeline.
pub fn parse_pipeline(source: &str) -> Result<Pipeline> {
    let program = parse(source)?;
    Ok(lower(&program)?)
}

/// Read and lower a pipeline description file.
pub fn load(path: impl AsRef<Path>) -> Result<Pipeline> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_pipeline(&source).with_context(|| format!("in {}", path.display()))
}

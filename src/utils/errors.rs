//! Error types for the layout optimizer.
//!
//! Errors are grouped by the phase that produces them. Frontend errors
//! carry a source span; pipeline and transformation errors carry a kind
//! so callers can decide whether a failure is fatal.

use crate::utils::location::Span;
use std::fmt;
use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Error during lexing
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error while checking a parsed pipeline
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    /// Malformed pipeline graph
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A layout transformation could not be applied
    #[error("Transformation error: {0}")]
    Transform(#[from] TransformError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    /// Source span of a frontend error.
    pub fn span(&self) -> Option<Span> {
        match self {
            LayoutError::Lexer(e) => Some(e.span),
            LayoutError::Parse(e) => Some(e.span),
            LayoutError::Semantic(e) => Some(e.span),
            _ => None,
        }
    }
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
#[error("{message} at {span}")]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

/// What went wrong while lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Invalid number literal
    InvalidNumber,
    /// Block comment without its closing `*/`
    UnterminatedComment,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected an identifier
    ExpectedIdentifier,
    /// Malformed range literal
    InvalidRange,
    /// Unexpected end of file
    UnexpectedEof,
}

/// Error found while lowering a parsed pipeline.
#[derive(Error, Debug, Clone)]
#[error("{message} at {span}")]
pub struct SemanticError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of semantic error
    pub kind: SemanticErrorKind,
}

/// What went wrong while checking a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Update, call or output names a stage that was never defined
    UndefinedStage,
    /// Expression uses a variable the definition does not loop over
    UndefinedVariable,
    /// Stage defined twice
    DuplicateDefinition,
    /// Call arity differs from the stage's dimensionality
    ArityMismatch,
    /// Loop order is not a permutation of the definition's variables
    InvalidLoopOrder,
    /// Empty or inverted range
    InvalidBounds,
}

/// Error in the shape of a pipeline graph.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct PipelineError {
    /// The error message
    pub message: String,
    /// The kind of pipeline error
    pub kind: PipelineErrorKind,
}

impl PipelineError {
    /// Pipeline error with `message`.
    pub fn new(message: impl Into<String>, kind: PipelineErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// What is wrong with a pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// No output stage given
    NoOutputs,
    /// Output name is not a stage
    UnknownOutput,
    /// Same stage name used twice
    DuplicateStage,
    /// Domain ranges do not match the argument count
    DomainMismatch,
}

/// Error applying a layout transformation.
#[derive(Error, Debug, Clone)]
#[error("{message} in {transform}")]
pub struct TransformError {
    /// The error message
    pub message: String,
    /// The kind of transformation error
    pub kind: TransformErrorKind,
    /// The transformation that failed
    pub transform: String,
}

impl TransformError {
    /// Error raised by `transform` with `message`.
    pub fn new(
        message: impl Into<String>,
        kind: TransformErrorKind,
        transform: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            transform: transform.into(),
        }
    }
}

/// Why a transformation could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
    /// Target stage is not in the pipeline environment
    StageNotFound,
    /// Target has too few dimensions for this transformation
    NotApplicable,
    /// Replacement stage name already exists
    NameCollision,
    /// Invalid transformation parameter
    InvalidParameter,
}

/// Result type using LayoutError.
pub type LayoutResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "Unexpected token".to_string(),
            span: Span::new(1, 5, 1, 10),
            kind: ParseErrorKind::UnexpectedToken,
            found: Some("number".to_string()),
        };
        let s = format!("{}", err);
        assert!(s.contains("Unexpected token"));
        assert!(s.contains("1:5-10"));
        assert!(s.contains("number"));
    }

    #[test]
    fn test_transform_error_display() {
        let err = TransformError::new(
            "stage 'foo' not found",
            TransformErrorKind::StageNotFound,
            "Reorder",
        );
        assert_eq!(err.to_string(), "stage 'foo' not found in Reorder");
        let top: LayoutError = err.into();
        assert!(top.to_string().starts_with("Transformation error"));
        assert!(top.span().is_none());
    }
}

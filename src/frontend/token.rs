//! Token types for the pipeline description language.

use crate::utils::location::Span;
use std::fmt;

/// A token in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source span
    pub span: Span,
    /// The lexeme (raw text)
    pub lexeme: String,
}

impl Token {
    /// Token of `kind` covering `span`.
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }

    /// Whether this is the end-of-file token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer,
    /// Floating-point literal
    Float,

    /// Stage or variable name
    Identifier,

    // Keywords
    /// `func`: a stage and its base definition
    Func,
    /// `update`: an update definition of an existing stage
    Update,
    /// `output`: the pipeline outputs
    Output,
    /// `in`: introduces ranges
    In,
    /// `order`: explicit loop order, innermost first
    Order,
    /// `reduce`: reduction domain of an update
    Reduce,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `=`
    Equal,

    // Delimiters
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `,`
    Comma,
    /// `;`
    Semicolon,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Whether this kind is a reserved word.
    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(self, Func | Update | Output | In | Order | Reduce)
    }

    /// Get the keyword for a string, if it is a keyword.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        match s {
            "func" => Some(TokenKind::Func),
            "update" => Some(TokenKind::Update),
            "output" => Some(TokenKind::Output),
            "in" => Some(TokenKind::In),
            "order" => Some(TokenKind::Order),
            "reduce" => Some(TokenKind::Reduce),
            _ => None,
        }
    }

    /// Get a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Integer => "integer",
            Float => "float",
            Identifier => "identifier",
            Func => "func",
            Update => "update",
            Output => "output",
            In => "in",
            Order => "order",
            Reduce => "reduce",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Equal => "=",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            Comma => ",",
            Semicolon => ";",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("update"), Some(TokenKind::Update));
        assert_eq!(TokenKind::keyword("func"), Some(TokenKind::Func));
        assert_eq!(TokenKind::keyword("for"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(TokenKind::Reduce.is_keyword());
        assert!(!TokenKind::Plus.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
    }
}

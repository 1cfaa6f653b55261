//! Lexer for the pipeline description language.
//!
//! The lexer converts source text into a stream of tokens.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use std::iter::Peekable;
use std::str::Chars;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing source code.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Lexer over `source`, positioned at its start.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            at_eof: false,
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the character after the current one.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_is_digit(&mut self) -> bool {
        self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false)
    }

    /// Skip whitespace and comments. Block comments nest.
    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while matches!(self.peek(), Some(c) if c != '\n') {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        self.token_start = self.current_location();
        self.advance();
        self.advance();
        let mut depth = 1usize;
        while depth > 0 {
            match (self.advance(), self.peek()) {
                (Some('*'), Some('/')) => {
                    self.advance();
                    depth -= 1;
                }
                (Some('/'), Some('*')) => {
                    self.advance();
                    depth += 1;
                }
                (Some(_), _) => {}
                (None, _) => {
                    return Err(self.make_error(
                        "Unterminated block comment",
                        LexerErrorKind::UnterminatedComment,
                    ))
                }
            }
        }
        Ok(())
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        Token::new(kind, span, lexeme)
    }

    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    /// Scan a number literal. The first digit is already consumed.
    fn scan_number(&mut self) -> Result<Token, LexerError> {
        while self.peek_is_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            self.advance();
            while self.peek_is_digit() {
                self.advance();
            }
        }

        if self.peek() == Some('e') || self.peek() == Some('E') {
            is_float = true;
            self.advance();
            if self.peek() == Some('+') || self.peek() == Some('-') {
                self.advance();
            }
            if !self.peek_is_digit() {
                return Err(self.make_error(
                    "Invalid floating-point exponent",
                    LexerErrorKind::InvalidNumber,
                ));
            }
            while self.peek_is_digit() {
                self.advance();
            }
        }

        if is_float {
            Ok(self.make_token(TokenKind::Float))
        } else {
            Ok(self.make_token(TokenKind::Integer))
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().map(|c| c.is_xid_continue()).unwrap_or(false) {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, span, lexeme.to_string())
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_trivia()?;
        self.token_start = self.current_location();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '-' => Ok(self.make_token(TokenKind::Minus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '=' => Ok(self.make_token(TokenKind::Equal)),

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_xid_start() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(self.make_error(
                &format!("Unexpected character: '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Whether the end of input was reached.
    pub fn is_at_end(&self) -> bool {
        self.at_eof
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

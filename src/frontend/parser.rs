//! Parser for the pipeline description language.
//!
//! A recursive descent parser over the token stream. After an error the
//! parser skips to the next declaration and keeps going, so one run
//! reports every malformed declaration.
//!
//! ```text
//! program  := item* EOF
//! item     := func | update | output
//! func     := 'func' IDENT '(' idents? ')' ('in' ranges)? order? '=' exprs ';'
//! update   := 'update' IDENT ('reduce' rvar (',' rvar)*)? order? '=' exprs ';'
//! output   := 'output' idents ';'
//! rvar     := IDENT 'in' range
//! order    := 'order' idents
//! range    := '[' int ',' int ']'
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/') unary)*
//! unary    := '-' unary | primary
//! primary  := INT | FLOAT | IDENT ('(' exprs? ')')? | '(' expr ')'
//! ```

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::ir::BinaryOp;
use crate::utils::errors::{LayoutResult, ParseError, ParseErrorKind};
use log::debug;

/// A parser for the pipeline language.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Parser reading tokens from `lexer`.
    pub fn new(mut lexer: Lexer<'a>) -> LayoutResult<Self> {
        let first_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current: first_token.clone(),
            previous: first_token,
            errors: Vec::new(),
        })
    }

    /// Parse a complete program.
    ///
    /// Fails with the first parse error; later ones are logged.
    pub fn parse_program(&mut self) -> LayoutResult<Program> {
        let start = self.current.span;
        let mut program = Program::new();

        while !self.is_at_end() {
            match self.parse_item() {
                Ok(item) => program.items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize()?;
                }
            }
        }
        program.span = start.merge(&self.previous.span);

        let mut errors = std::mem::take(&mut self.errors).into_iter();
        match errors.next() {
            Some(first) => {
                for e in errors {
                    debug!("additional parse error: {}", e);
                }
                Err(first.into())
            }
            None => Ok(program),
        }
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        match self.current.kind {
            TokenKind::Func => Ok(Item::Func(self.parse_func()?)),
            TokenKind::Update => Ok(Item::Update(self.parse_update()?)),
            TokenKind::Output => Ok(Item::Output(self.parse_output()?)),
            _ => Err(self.error(
                "Expected 'func', 'update' or 'output'",
                ParseErrorKind::UnexpectedToken,
            )),
        }
    }

    fn parse_func(&mut self) -> Result<FuncDecl, ParseError> {
        let start = self.current.span;
        self.consume(TokenKind::Func, "Expected 'func'")?;
        let name = self.consume_identifier("Expected stage name")?;

        self.consume(TokenKind::LeftParen, "Expected '(' after stage name")?;
        let args = if self.check(TokenKind::RightParen) {
            Vec::new()
        } else {
            self.parse_idents()?
        };
        self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;

        let mut domain = Vec::new();
        if self.match_token(TokenKind::In)? {
            domain.push(self.parse_range()?);
            while self.match_token(TokenKind::Comma)? {
                domain.push(self.parse_range()?);
            }
        }

        let order = self.parse_order()?;
        self.consume(TokenKind::Equal, "Expected '=' before definition")?;
        let values = self.parse_exprs()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after definition")?;

        Ok(FuncDecl {
            name,
            args,
            domain,
            order,
            values,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_update(&mut self) -> Result<UpdateDecl, ParseError> {
        let start = self.current.span;
        self.consume(TokenKind::Update, "Expected 'update'")?;
        let name = self.consume_identifier("Expected stage name")?;

        let mut reduction = Vec::new();
        if self.match_token(TokenKind::Reduce)? {
            loop {
                let var = self.consume_identifier("Expected reduction variable")?;
                self.consume(TokenKind::In, "Expected 'in' after reduction variable")?;
                let range = self.parse_range()?;
                reduction.push(ReduceVar { name: var, range });
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }

        let order = self.parse_order()?;
        self.consume(TokenKind::Equal, "Expected '=' before definition")?;
        let values = self.parse_exprs()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after definition")?;

        Ok(UpdateDecl {
            name,
            reduction,
            order,
            values,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_output(&mut self) -> Result<OutputDecl, ParseError> {
        let start = self.current.span;
        self.consume(TokenKind::Output, "Expected 'output'")?;
        let names = self.parse_idents()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after outputs")?;
        Ok(OutputDecl {
            names,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_order(&mut self) -> Result<Option<Vec<Ident>>, ParseError> {
        if self.match_token(TokenKind::Order)? {
            Ok(Some(self.parse_idents()?))
        } else {
            Ok(None)
        }
    }

    fn parse_idents(&mut self) -> Result<Vec<Ident>, ParseError> {
        let mut idents = vec![self.consume_identifier("Expected identifier")?];
        while self.match_token(TokenKind::Comma)? {
            idents.push(self.consume_identifier("Expected identifier after ','")?);
        }
        Ok(idents)
    }

    fn parse_range(&mut self) -> Result<RangeLit, ParseError> {
        let start = self.current.span;
        self.consume(TokenKind::LeftBracket, "Expected '[' to open a range")?;
        let min = self.parse_bound()?;
        self.consume(TokenKind::Comma, "Expected ',' between range bounds")?;
        let max = self.parse_bound()?;
        self.consume(TokenKind::RightBracket, "Expected ']' to close a range")?;
        Ok(RangeLit {
            min,
            max,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_bound(&mut self) -> Result<i64, ParseError> {
        let negative = self.match_token(TokenKind::Minus)?;
        if !self.check(TokenKind::Integer) {
            return Err(self.error("Range bounds must be integers", ParseErrorKind::InvalidRange));
        }
        let value: i64 = self
            .current
            .lexeme
            .parse()
            .map_err(|_| self.error("Integer out of range", ParseErrorKind::InvalidRange))?;
        self.advance()?;
        Ok(if negative { -value } else { value })
    }

    fn parse_exprs(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expression()?];
        while self.match_token(TokenKind::Comma)? {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span;
        if self.match_token(TokenKind::Minus)? {
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(Expr::new(ExprKind::Neg(Box::new(operand)), span));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::Integer => {
                let value: i64 = self.current.lexeme.parse().map_err(|_| {
                    self.error("Integer out of range", ParseErrorKind::ExpectedExpression)
                })?;
                self.advance()?;
                Ok(Expr::new(ExprKind::Int(value), start))
            }
            TokenKind::Float => {
                let value: f64 = self.current.lexeme.parse().map_err(|_| {
                    self.error("Invalid float literal", ParseErrorKind::ExpectedExpression)
                })?;
                self.advance()?;
                Ok(Expr::new(ExprKind::Float(value), start))
            }
            TokenKind::Identifier => {
                let name = self.current.lexeme.clone();
                self.advance()?;
                if self.match_token(TokenKind::LeftParen)? {
                    let args = if self.check(TokenKind::RightParen) {
                        Vec::new()
                    } else {
                        self.parse_exprs()?
                    };
                    self.consume(TokenKind::RightParen, "Expected ')' after call arguments")?;
                    Ok(Expr::new(
                        ExprKind::Call { name, args },
                        start.merge(&self.previous.span),
                    ))
                } else {
                    Ok(Expr::new(ExprKind::Var(name), start))
                }
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')'")?;
                Ok(Expr::new(
                    ExprKind::Grouped(Box::new(inner)),
                    start.merge(&self.previous.span),
                ))
            }
            TokenKind::Eof => Err(self.error("Unexpected end of file", ParseErrorKind::UnexpectedEof)),
            _ => Err(self.error("Expected expression", ParseErrorKind::ExpectedExpression)),
        }
    }

    // Helper methods
    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let next = self.lexer.next_token().map_err(|e| ParseError {
            message: e.message.clone(),
            span: e.span,
            kind: ParseErrorKind::UnexpectedToken,
            found: None,
        })?;
        self.previous = std::mem::replace(&mut self.current, next);
        Ok(())
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance()
        } else if self.is_at_end() {
            Err(self.error(message, ParseErrorKind::UnexpectedEof))
        } else {
            Err(self.error(message, ParseErrorKind::UnexpectedToken))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<Ident, ParseError> {
        if self.check(TokenKind::Identifier) {
            let ident = Ident {
                name: self.current.lexeme.clone(),
                span: self.current.span,
            };
            self.advance()?;
            Ok(ident)
        } else {
            Err(self.error(message, ParseErrorKind::ExpectedIdentifier))
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn error(&self, message: &str, kind: ParseErrorKind) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.current.span,
            kind,
            found: Some(self.current.to_string()),
        }
    }

    /// Skip to the start of the next declaration.
    fn synchronize(&mut self) -> LayoutResult<()> {
        if !self.is_at_end() {
            self.advance()?;
        }
        while !self.is_at_end() {
            if self.previous.kind == TokenKind::Semicolon {
                return Ok(());
            }
            match self.current.kind {
                TokenKind::Func | TokenKind::Update | TokenKind::Output => return Ok(()),
                _ => {}
            }
            self.advance()?;
        }
        Ok(())
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

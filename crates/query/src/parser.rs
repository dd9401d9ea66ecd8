//! Recursive-descent parser for selection queries.
//!
//! ```text
//! Document  := [ 'query' [Name] ] '{' Field+ '}'
//! Field     := Name [ '(' Argument+ ')' ] [ '{' Field+ '}' ]
//! Argument  := Name ':' Value
//! Value     := Int | Float | String | Name
//! ```

use crate::ast::{Argument, Document, Field, Value};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Deepest selection-set nesting accepted, counting the outermost braces.
pub const MAX_DEPTH: usize = 128;

/// Parse query text into a document.
pub fn parse_query(input: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(input)?;
    let document = parser.parse_document()?;
    parser.expect(&TokenKind::Eof)?;
    Ok(document)
}

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser from source text.
    pub fn new(input: &str) -> ParseResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(ParseError::unexpected_token(
                token.span,
                kind.name(),
                token.kind.name(),
            ))
        }
    }

    fn expect_name(&mut self) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::unexpected_token(
                self.peek().span,
                "name",
                other.name(),
            )),
        }
    }

    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut name = None;
        if matches!(&self.peek().kind, TokenKind::Name(n) if n == "query") {
            self.advance();
            if matches!(self.peek().kind, TokenKind::Name(_)) {
                name = Some(self.expect_name()?);
            }
        }
        let fields = self.parse_selection_set()?;
        Ok(Document { name, fields })
    }

    /// `'{' Field+ '}'`
    fn parse_selection_set(&mut self) -> ParseResult<Vec<Field>> {
        let open = self.expect(&TokenKind::LBrace)?;
        if self.depth == MAX_DEPTH {
            return Err(ParseError::new(
                format!("selection sets nested deeper than {MAX_DEPTH} levels"),
                open.span,
            ));
        }
        self.depth += 1;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                let token = self.peek();
                return Err(ParseError::unexpected_token(token.span, "'}'", token.kind.name()));
            }
            fields.push(self.parse_field()?);
        }
        let close = self.expect(&TokenKind::RBrace)?;
        if fields.is_empty() {
            return Err(ParseError::new("selection set must not be empty", close.span));
        }
        self.depth -= 1;
        Ok(fields)
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        let span = self.peek().span;
        let name = self.expect_name()?;

        let mut arguments = Vec::new();
        if self.check(&TokenKind::LParen) {
            self.advance();
            while !self.check(&TokenKind::RParen) {
                arguments.push(self.parse_argument()?);
            }
            let close = self.expect(&TokenKind::RParen)?;
            if arguments.is_empty() {
                return Err(ParseError::new("argument list must not be empty", close.span));
            }
        }

        let selection_set = if self.check(&TokenKind::LBrace) {
            self.parse_selection_set()?
        } else {
            Vec::new()
        };

        Ok(Field {
            name,
            arguments,
            selection_set,
            span,
        })
    }

    fn parse_argument(&mut self) -> ParseResult<Argument> {
        let span = self.peek().span;
        let name = self.expect_name()?;
        self.expect(&TokenKind::Colon)?;
        let token = self.advance();
        let value = match token.kind {
            TokenKind::Int(n) => Value::Int(n),
            TokenKind::Float(f) => Value::Float(f),
            TokenKind::String(s) => Value::String(s),
            TokenKind::Name(n) => Value::Name(n),
            other => {
                return Err(ParseError::unexpected_token(
                    token.span,
                    "value",
                    other.name(),
                ));
            }
        };
        Ok(Argument { name, value, span })
    }
}

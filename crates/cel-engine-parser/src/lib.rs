//! CEL (Common Expression Language) lexer and parser.
//!
//! Turns source text into a [`SpannedExpr`] tree. Macro calls such as
//! `items.exists(x, x > 0)` are kept as ordinary calls here; resolving them
//! is the checker's job.

pub mod ast;
mod lexer;
mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};
pub use lexer::{lex, LexError, SpannedToken, Token};
pub use parser::{ParseError, ParseOptions, Parser, DEFAULT_MAX_DEPTH};

/// Failure to turn source text into an AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn message(&self) -> &str {
        match self {
            SyntaxError::Lex(e) => &e.message,
            SyntaxError::Parse(e) => &e.message,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(e) => e.span.clone(),
            SyntaxError::Parse(e) => e.span.clone(),
        }
    }
}

/// Parse a CEL expression from source with default options.
pub fn parse(input: &str) -> Result<SpannedExpr, SyntaxError> {
    parse_with_options(input, ParseOptions::default())
}

/// Parse a CEL expression from source.
pub fn parse_with_options(input: &str, options: ParseOptions) -> Result<SpannedExpr, SyntaxError> {
    let tokens = lexer::lex(input)?;
    Ok(parser::parse_tokens(&tokens, options)?)
}

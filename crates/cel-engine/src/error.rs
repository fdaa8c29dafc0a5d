//! Top-level error type covering every stage of a CEL run.

use std::fmt;

use cel_engine_checker::CompileError;
use cel_engine_parser::{LexError, ParseError, Span, SyntaxError};
use thiserror::Error;

use crate::eval::EvalError;

/// An error from compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// The stage at which an [`Error`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Lex,
    Parse,
    Compile,
    Eval,
}

impl ErrorCategory {
    /// Whether the error was raised before evaluation started.
    pub fn is_compile_time(self) -> bool {
        !matches!(self, ErrorCategory::Eval)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Lex => "lex",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Compile => "compile",
            ErrorCategory::Eval => "eval",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Lex(_) => ErrorCategory::Lex,
            Error::Parse(_) => ErrorCategory::Parse,
            Error::Compile(_) => ErrorCategory::Compile,
            Error::Eval(_) => ErrorCategory::Eval,
        }
    }

    /// The error message without position information.
    pub fn message(&self) -> String {
        match self {
            Error::Lex(e) => e.message.clone(),
            Error::Parse(e) => e.message.clone(),
            Error::Compile(e) => e.message(),
            Error::Eval(e) => e.message.clone(),
        }
    }

    /// Byte range of the offending source text, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex(e) => Some(e.span.clone()),
            Error::Parse(e) => Some(e.span.clone()),
            Error::Compile(e) => Some(e.span.clone()),
            Error::Eval(e) => e.span.clone(),
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::Lex(e) => Error::Lex(e),
            SyntaxError::Parse(e) => Error::Parse(e),
        }
    }
}

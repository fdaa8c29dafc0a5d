//! Error types for checking and compiling expressions.

use cel_engine_parser::Span;
use thiserror::Error;

use crate::macros::ArgCount;

/// A compile error raised while turning an AST into IR.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {}..{}", span.start, span.end)]
pub struct CompileError {
    /// The kind of error.
    pub kind: CompileErrorKind,
    /// The source span where the error occurred.
    pub span: Span,
    /// The expression ID where the error occurred.
    pub expr_id: i64,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span, expr_id: i64) -> Self {
        Self {
            kind,
            span,
            expr_id,
        }
    }

    /// Get the error message without position information.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// The kind of compile error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    #[error("{name}() macro expects {expected} arguments, got {actual}")]
    MacroArgumentCount {
        name: String,
        expected: ArgCount,
        actual: usize,
    },

    #[error("{name}() macro requires a simple identifier as its iteration variable")]
    InvalidIterationVariable { name: String },

    #[error("{name}() macro binds '{variable}' more than once")]
    DuplicateIterationVariable { name: String, variable: String },

    #[error("has() macro requires a field selection argument such as has(a.b)")]
    InvalidHasArgument,

    #[error("{function}() expects {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: ArgCount,
        actual: usize,
    },

    #[error("{function}() must be called as a method on a value")]
    ReceiverRequired { function: String },

    #[error("{function}() cannot be called as a method")]
    ReceiverNotAllowed { function: String },

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("struct literal type must be a qualified name")]
    InvalidStructType,

    #[error("field '{field}' is initialized more than once")]
    DuplicateField { field: String },
}

//! Evaluation error types.

use cel_engine_parser::Span;
use thiserror::Error;

use super::Value;

/// An error that occurred during CEL evaluation.
///
/// The span points at the innermost expression where evaluation failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    pub span: Option<Span>,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// Integer overflow.
    Overflow,
    /// An operand had the wrong type for a boolean context.
    TypeMismatch,
    /// Variable not found in the context.
    UnknownIdentifier,
    UnknownFunction,
    IndexOutOfBounds,
    /// Key not found in map.
    KeyNotFound,
    /// Field not found on a struct.
    FieldNotFound,
    InvalidArgument,
    /// No overload accepts the argument types.
    NoMatchingOverload,
    InvalidConversion,
    /// Timestamp or duration outside the supported range.
    Range,
    /// Evaluator invariant violated.
    Internal,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a span unless a more precise one is already set.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "modulo by zero")
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Overflow, message)
    }

    pub fn type_mismatch(expected: &str, actual: &Value) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {}, got {}", expected, actual.type_name()),
        )
    }

    pub fn unknown_identifier(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownIdentifier,
            format!("undeclared reference to '{}'", name),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function: {}", name),
        )
    }

    pub fn index_out_of_bounds(index: &Value, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} out of bounds for list of length {}", index, len),
        )
    }

    pub fn key_not_found(key: &Value) -> Self {
        Self::new(EvalErrorKind::KeyNotFound, format!("no such key: {}", key))
    }

    pub fn field_not_found(field: &str) -> Self {
        Self::new(
            EvalErrorKind::FieldNotFound,
            format!("no such field: {}", field),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    /// No overload of `function` accepts the given arguments.
    pub fn no_matching_overload(function: &str, args: &[&Value]) -> Self {
        let types: Vec<&str> = args.iter().map(|v| v.type_name()).collect();
        Self::new(
            EvalErrorKind::NoMatchingOverload,
            format!(
                "no matching overload for '{}' applied to ({})",
                function,
                types.join(", ")
            ),
        )
    }

    pub fn invalid_conversion(from: &Value, to: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidConversion,
            format!("cannot convert {} to {}", from, to),
        )
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Range, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_span_wins() {
        let err = EvalError::division_by_zero().with_span(4..9).with_span(0..12);
        assert_eq!(err.span, Some(4..9));
    }

    #[test]
    fn overload_message_names_types() {
        let err = EvalError::no_matching_overload("_+_", &[&Value::Int(1), &Value::UInt(2)]);
        assert_eq!(err.kind, EvalErrorKind::NoMatchingOverload);
        assert_eq!(
            err.to_string(),
            "no matching overload for '_+_' applied to (int, uint)"
        );
    }
}

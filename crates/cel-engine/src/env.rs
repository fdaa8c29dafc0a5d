//! Compilation environment.
//!
//! The `Env` struct coordinates the parse and check stages and carries the
//! options that shape them.

use cel_engine_checker::{check_with_options, CheckOptions};
use cel_engine_parser::{parse_with_options, ParseOptions, DEFAULT_MAX_DEPTH};

use crate::eval::{Activation, Program, Value};
use crate::Error;

/// Configuration for compiling CEL expressions.
///
/// # Example
///
/// ```
/// use cel_engine::{Env, ErrorCategory};
///
/// let env = Env::new().with_max_nesting_depth(8);
///
/// assert!(env.compile("((1))").is_ok());
/// let err = env.compile("((((((((((1))))))))))").unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::Parse);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    max_nesting_depth: usize,
    macros: bool,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            macros: true,
        }
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit. Each operator in a chain such as `a || b || c`
    /// counts as one level.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Enable or disable macro expansion. With macros disabled, `has`,
    /// `all` and the other macro names compile as plain calls to unknown
    /// functions, which fail when evaluated.
    pub fn with_macros(mut self, enabled: bool) -> Self {
        self.macros = enabled;
        self
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    pub fn macros_enabled(&self) -> bool {
        self.macros
    }

    /// Parse and check an expression into a reusable [`Program`].
    pub fn compile(&self, source: &str) -> Result<Program, Error> {
        tracing::debug!(source_len = source.len(), "compiling expression");

        let parse_options = ParseOptions {
            max_depth: self.max_nesting_depth,
        };
        let ast = parse_with_options(source, parse_options).map_err(|err| {
            tracing::debug!(error = %err, "parse failed");
            Error::from(err)
        })?;

        let check_options = CheckOptions {
            macros: self.macros,
        };
        let root = check_with_options(&ast, check_options).map_err(|err| {
            tracing::debug!(error = %err, "check failed");
            Error::from(err)
        })?;

        let program = Program::new(root, source);
        tracing::debug!(
            references = ?program.references().collect::<Vec<_>>(),
            "compiled expression"
        );
        Ok(program)
    }

    /// Compile and execute an expression in one step.
    pub fn evaluate(&self, source: &str, activation: &dyn Activation) -> Result<Value, Error> {
        Ok(self.compile(source)?.execute(activation)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Context, EvalErrorKind};
    use crate::ErrorCategory;

    #[test]
    fn defaults() {
        let env = Env::default();
        assert_eq!(env.max_nesting_depth(), 250);
        assert!(env.macros_enabled());
        assert_eq!(Env::new(), env);
    }

    #[test]
    fn nesting_limit() {
        let source = format!("{}1{}", "[".repeat(20), "]".repeat(20));
        assert!(Env::new().compile(&source).is_ok());

        let err = Env::new().with_max_nesting_depth(10).compile(&source).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Parse);
        assert!(err.message().contains("maximum depth of 10"));
    }

    #[test]
    fn macros_can_be_disabled() {
        let env = Env::new().with_macros(false);
        let program = env.compile("[1, 2].all(x, x > 0)").unwrap();
        let err = program.execute(&Context::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UnknownFunction);
    }

    #[test]
    fn evaluate_reports_each_stage() {
        let env = Env::new();
        let context = Context::new().with_variable("x", 2);
        assert_eq!(env.evaluate("x * 21", &context), Ok(Value::Int(42)));
        assert_eq!(
            env.evaluate("x +", &context).unwrap_err().category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            env.evaluate("[1].all(1, true)", &context).unwrap_err().category(),
            ErrorCategory::Compile
        );
        assert_eq!(
            env.evaluate("x / 0", &context).unwrap_err().category(),
            ErrorCategory::Eval
        );
    }
}

//! cel-engine: compile and evaluate Common Expression Language expressions.
//!
//! An expression is compiled once into a [`Program`] and can then be
//! executed any number of times, from any number of threads, against
//! different variable bindings.
//!
//! # Quick Start
//!
//! ```
//! use cel_engine::{Context, Value};
//!
//! let program = cel_engine::compile("items.filter(i, i.price > limit).size()").unwrap();
//!
//! let context = Context::from_json(&serde_json::json!({
//!     "items": [{"price": 5}, {"price": 12}, {"price": 30}],
//!     "limit": 10,
//! }))
//! .unwrap();
//!
//! assert_eq!(program.execute(&context), Ok(Value::Int(2)));
//! ```
//!
//! # Architecture
//!
//! - **Parser** (`cel-engine-parser`): source text to AST
//! - **Checker** (`cel-engine-checker`): macro expansion and static
//!   validation, producing an evaluable tree
//! - **Evaluator** (`eval`): walks the tree against an [`Activation`]
//!
//! Errors from every stage are reported as [`Error`], whose
//! [`category`](Error::category) tells compile-time failures apart from
//! evaluation failures.

mod env;
mod error;
pub mod eval;

pub use env::Env;
pub use error::{Error, ErrorCategory};

pub use eval::{
    Activation, Context, Duration, EmptyActivation, EvalError, EvalErrorKind, Evaluator, MapKey,
    Program, StructValue, Timestamp, UnknownSet, Value, ValueMap, WEEK_STARTS_ON,
};

pub use cel_engine_checker::{CompileError, CompileErrorKind};
pub use cel_engine_parser::{LexError, ParseError, Span};

/// Compile an expression with the default [`Env`].
pub fn compile(source: &str) -> Result<Program, Error> {
    Env::default().compile(source)
}

/// Compile and execute an expression with the default [`Env`].
///
/// ```
/// use cel_engine::{Context, Value};
///
/// let context = Context::new().with_variable("name", "world");
/// let greeting = cel_engine::evaluate("'hello ' + name", &context).unwrap();
/// assert_eq!(greeting, Value::from("hello world"));
/// ```
pub fn evaluate(source: &str, activation: &dyn Activation) -> Result<Value, Error> {
    Env::default().evaluate(source, activation)
}

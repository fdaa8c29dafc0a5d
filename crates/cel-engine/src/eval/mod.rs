//! CEL evaluation engine.
//!
//! - `Value` represents runtime values
//! - `Activation` provides variable bindings
//! - `Program` wraps a compiled expression
//! - `Evaluator` performs tree-walking evaluation
//!
//! # Example
//!
//! ```
//! use cel_engine::{Context, Env, Value};
//!
//! let program = Env::default().compile("x + 1").unwrap();
//!
//! let mut context = Context::new();
//! context.insert("x", 41);
//!
//! assert_eq!(program.execute(&context), Ok(Value::Int(42)));
//! ```

mod activation;
mod error;
mod evaluator;
mod functions;
mod json;
mod program;
pub mod time;
mod value;

pub use activation::{Activation, Context, EmptyActivation};
pub use error::{EvalError, EvalErrorKind};
pub use evaluator::Evaluator;
pub use program::Program;
pub use time::WEEK_STARTS_ON;
pub use value::{Duration, MapKey, StructValue, Timestamp, UnknownSet, Value, ValueMap};

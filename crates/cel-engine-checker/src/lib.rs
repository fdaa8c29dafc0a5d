//! CEL checker.
//!
//! Turns a parsed [`SpannedExpr`](cel_engine_parser::SpannedExpr) into the
//! immutable [`Node`] tree the evaluator runs. Checking expands macros,
//! resolves comprehension variables and validates built-in calls, so an
//! expression that checks cleanly can only fail at evaluation because of the
//! values it sees.
//!
//! # Example
//!
//! ```
//! use cel_engine_checker::{check, NodeKind};
//!
//! let ast = cel_engine_parser::parse("items.exists(i, i > limit)").unwrap();
//! let node = check(&ast).unwrap();
//!
//! assert!(matches!(node.kind, NodeKind::Comprehension(_)));
//! let refs: Vec<String> = node.references().iter().map(|r| r.to_string()).collect();
//! assert_eq!(refs, ["items", "limit"]);
//! ```

mod checker;
mod errors;
pub mod ir;
pub mod macros;
mod scope;
pub mod standard_library;

pub use checker::{check, check_with_options, CheckOptions, Checker};
pub use errors::{CompileError, CompileErrorKind};
pub use ir::{Call, Comprehension, ComprehensionKind, Constant, Function, Node, NodeKind, Pattern};
pub use macros::{ArgCount, MacroStyle, STANDARD_MACROS};
pub use standard_library::{Builtin, CallStyle, FunctionDecl, STANDARD_LIBRARY};

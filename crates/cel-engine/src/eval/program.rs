//! Compiled CEL program ready for evaluation.
//!
//! A `Program` owns a checked expression tree. It is immutable, so one
//! program can be cloned cheaply and executed concurrently from many threads
//! against different activations.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use cel_engine_checker::Node;

use super::{Activation, EmptyActivation, EvalError, Evaluator, Value};

/// A compiled CEL program.
#[derive(Clone)]
pub struct Program {
    root: Arc<Node>,
    source: Arc<str>,
    references: Arc<BTreeSet<Arc<str>>>,
}

impl Program {
    /// Wrap a checked expression tree compiled from `source`.
    pub fn new(root: Node, source: impl Into<Arc<str>>) -> Self {
        let references = root.references();
        Self {
            root: Arc::new(root),
            source: source.into(),
            references: Arc::new(references),
        }
    }

    /// The expression text this program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the free variables the expression reads, sorted.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.references.iter().map(|name| name.as_ref())
    }

    /// Evaluate the program against variable bindings.
    pub fn execute(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        tracing::trace!(source = %self.source, "executing program");
        let result = Evaluator::new(activation).eval(&self.root);
        if let Err(err) = &result {
            tracing::debug!(
                source = %self.source,
                kind = ?err.kind,
                error = %err,
                "evaluation failed"
            );
        }
        result
    }

    /// Evaluate the program with no variable bindings.
    pub fn execute_empty(&self) -> Result<Value, EvalError> {
        self.execute(&EmptyActivation)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("source", &self.source)
            .field("references", &self.references)
            .finish()
    }
}

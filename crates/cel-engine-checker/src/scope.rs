//! Lexical scopes for macro-bound variables.
//!
//! Each comprehension body gets its own scope holding the names it binds.
//! Inner scopes shadow outer ones; anything not bound by an enclosing
//! comprehension is a free variable left for the activation.

use std::sync::Arc;

/// Names bound by a single comprehension, in binding order.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: Vec<Arc<str>>,
}

impl Scope {
    pub fn new(names: impl IntoIterator<Item = Arc<str>>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

/// A stack of scopes for nested variable resolution.
#[derive(Debug, Default)]
pub struct ScopeStack {
    /// The scope stack (innermost scope is last).
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new scope onto the stack.
    pub fn enter_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pop the current scope from the stack.
    pub fn exit_scope(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// Resolve a name to its binding depth, counting individual bindings
    /// outward from the most recent one.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        let mut depth = 0;
        for scope in self.scopes.iter().rev() {
            for bound in scope.names.iter().rev() {
                if bound.as_ref() == name {
                    return Some(depth);
                }
                depth += 1;
            }
        }
        None
    }
}

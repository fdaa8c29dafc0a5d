//! Variable bindings for CEL evaluation.
//!
//! The `Activation` trait resolves top-level variable names to values.
//! [`Context`] is the standard implementation: a map of bindings plus a set
//! of names declared unknown.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{EvalError, Value};

/// Trait for resolving variable bindings during evaluation.
pub trait Activation: Send + Sync {
    /// Resolve a variable name to its value.
    ///
    /// Returns `None` if the variable is not defined in this activation.
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Whether the variable's value is deliberately withheld. Unknown
    /// variables evaluate to [`Value::Unknown`] instead of failing.
    fn is_unknown(&self, _name: &str) -> bool {
        false
    }
}

/// Variable bindings for one evaluation.
///
/// # Example
///
/// ```
/// use cel_engine::{Context, Value};
///
/// let mut context = Context::new();
/// context.insert("count", 3);
/// context.insert("name", "widget");
///
/// let program = cel_engine::compile("size(name) > count").unwrap();
/// assert_eq!(program.execute(&context), Ok(Value::Bool(true)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: HashMap<String, Value>,
    unknowns: HashSet<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object, one variable per member.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, EvalError> {
        let serde_json::Value::Object(members) = json else {
            return Err(EvalError::invalid_argument(format!(
                "context must be a JSON object, got {}",
                json_kind(json)
            )));
        };
        Ok(members
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value)))
            .collect())
    }

    /// Insert a binding, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Add a binding (builder pattern).
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Mark a variable as unknown. An unknown declaration takes precedence
    /// over any binding of the same name.
    pub fn declare_unknown(&mut self, name: impl Into<String>) {
        self.unknowns.insert(name.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (name, value) in iter {
            context.insert(name, value);
        }
        context
    }
}

impl TryFrom<serde_json::Value> for Context {
    type Error = EvalError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Context::from_json(&json)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl Activation for Context {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn is_unknown(&self, name: &str) -> bool {
        self.unknowns.contains(name)
    }
}

/// An activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl Activation for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<T: Activation + ?Sized> Activation for Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn is_unknown(&self, name: &str) -> bool {
        (**self).is_unknown(name)
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn is_unknown(&self, name: &str) -> bool {
        (**self).is_unknown(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_bindings() {
        let mut context = Context::new();
        context.insert("x", 42);
        context.insert("name", "hello");

        assert_eq!(context.resolve("x"), Some(Value::Int(42)));
        assert_eq!(context.resolve("name"), Some(Value::from("hello")));
        assert_eq!(context.resolve("missing"), None);
        assert_eq!(context.len(), 2);

        assert_eq!(context.remove("x"), Some(Value::Int(42)));
        assert_eq!(context.resolve("x"), None);
    }

    #[test]
    fn unknown_declarations() {
        let mut context = Context::new().with_variable("user", "alice");
        context.declare_unknown("user");

        assert!(context.is_unknown("user"));
        assert!(!context.is_unknown("other"));
        assert!(!EmptyActivation.is_unknown("user"));
    }

    #[test]
    fn from_json_object() {
        let context = Context::from_json(&json!({
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(context.resolve("count"), Some(Value::Int(3)));
        assert_eq!(context.resolve("ratio"), Some(Value::Double(0.5)));
        assert_eq!(
            context.resolve("tags"),
            Some(Value::list(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = Context::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.message, "context must be a JSON object, got an array");
        assert!(Context::try_from(json!(null)).is_err());
    }

    #[test]
    fn collects_from_pairs() {
        let context: Context = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(context.resolve("b"), Some(Value::Int(2)));
    }

    #[test]
    fn shared_activations_delegate() {
        let context = Arc::new(Context::new().with_variable("x", true));
        let by_ref: &dyn Activation = &context;
        assert_eq!(by_ref.resolve("x"), Some(Value::Bool(true)));
    }
}

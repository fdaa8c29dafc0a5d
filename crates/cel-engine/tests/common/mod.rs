//! Shared helpers for cel-engine integration tests.

use cel_engine::{Context, Error, Program, Value};

/// Build a context from a JSON object literal.
#[allow(dead_code)]
pub fn context(json: serde_json::Value) -> Context {
    match Context::from_json(&json) {
        Ok(context) => context,
        Err(e) => panic!("invalid test context {}: {}", json, e),
    }
}

/// Compile source, asserting it succeeds.
#[allow(dead_code)]
pub fn assert_compiles(source: &str) -> Program {
    match cel_engine::compile(source) {
        Ok(program) => program,
        Err(e) => panic!("failed to compile '{}': {}", source, e),
    }
}

/// Evaluate source against a JSON context, asserting it succeeds.
#[allow(dead_code)]
pub fn assert_evaluates(source: &str, json: serde_json::Value) -> Value {
    match cel_engine::evaluate(source, &context(json)) {
        Ok(value) => value,
        Err(e) => panic!("failed to evaluate '{}': {}", source, e),
    }
}

/// Evaluate source with no bindings and convert the result to JSON.
#[allow(dead_code)]
pub fn evaluate_to_json(source: &str) -> serde_json::Value {
    let value = assert_evaluates(source, serde_json::json!({}));
    match serde_json::to_value(&value) {
        Ok(json) => json,
        Err(e) => panic!("result of '{}' does not serialize: {}", source, e),
    }
}

/// Evaluate source and assert it fails, returning the error.
#[allow(dead_code)]
pub fn assert_fails(source: &str, json: serde_json::Value) -> Error {
    match cel_engine::evaluate(source, &context(json)) {
        Ok(value) => panic!("expected '{}' to fail, got {}", source, value),
        Err(e) => e,
    }
}

/// Install a test subscriber so `RUST_LOG` shows engine logs.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

//! Handling CEL compile and evaluation errors.
//!
//! Run with: cargo run -p cel-engine --example error_handling
//!
//! Set `RUST_LOG=cel_engine=debug` to see the engine's own log events.

use cel_engine::{Context, Error, Value};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn report(source: &str, result: Result<Value, Error>) {
    match result {
        Ok(value) => println!("{:<45} => {}", source, value),
        Err(err) => {
            let at = err
                .span()
                .map(|span| format!(" at {}..{}", span.start, span.end))
                .unwrap_or_default();
            println!("{:<45} => [{}] {}{}", source, err.category(), err.message(), at);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let context = Context::from_json(&json!({
        "x": 0,
        "items": [1, 2, 3],
        "config": {"host": "localhost"},
    }))
    .unwrap();

    // Compile-time failures never reach the evaluator
    println!("=== Compile errors ===");
    for source in ["1 +", "'unterminated", "[1].all(1, true)", "'a'.matches('(')"] {
        report(source, cel_engine::evaluate(source, &context));
    }

    // Runtime failures carry the span of the failing subexpression
    println!("\n=== Evaluation errors ===");
    for source in [
        "10 / x",
        "items[10]",
        "config.missing_key",
        "9223372036854775807 + 1",
        "1 + 1u",
        "undefined_var > 3",
    ] {
        report(source, cel_engine::evaluate(source, &context));
    }

    // Logical operators absorb errors when the other side decides
    println!("\n=== Short-circuit ===");
    for source in [
        "false && 10 / x == 1",
        "10 / x == 1 || true",
        "has(config.missing_key) ? config.missing_key : 'default'",
    ] {
        report(source, cel_engine::evaluate(source, &context));
    }
}

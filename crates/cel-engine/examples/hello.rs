//! Minimal CEL example.
//!
//! Run with: cargo run -p cel-engine --example hello

use cel_engine::Context;

fn main() {
    let program = cel_engine::compile(r#""Hello, " + name + "!""#).unwrap();

    let context = Context::new().with_variable("name", "World");

    let result = program.execute(&context).unwrap();
    println!("{}", result);
}

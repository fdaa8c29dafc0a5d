//! Shared helpers for cel-engine-checker integration tests.

use cel_engine_checker::{check, CompileError, Node};

/// Parse and check input, asserting both succeed.
#[allow(dead_code)]
pub fn assert_checks(input: &str) -> Node {
    let ast = match cel_engine_parser::parse(input) {
        Ok(ast) => ast,
        Err(e) => panic!("failed to parse '{}': {}", input, e),
    };
    match check(&ast) {
        Ok(node) => node,
        Err(e) => panic!("failed to check '{}': {}", input, e),
    }
}

/// Parse input and assert checking it fails, returning the error.
#[allow(dead_code)]
pub fn assert_check_error(input: &str) -> CompileError {
    let ast = match cel_engine_parser::parse(input) {
        Ok(ast) => ast,
        Err(e) => panic!("failed to parse '{}': {}", input, e),
    };
    match check(&ast) {
        Ok(node) => panic!("expected compile error for '{}', got {:?}", input, node.kind),
        Err(e) => e,
    }
}

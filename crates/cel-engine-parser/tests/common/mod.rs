//! Shared helpers for cel-engine-parser integration tests.

use cel_engine_parser::{parse, SpannedExpr, SyntaxError};

/// Parse input and assert it succeeds, returning the AST.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> SpannedExpr {
    match parse(input) {
        Ok(ast) => ast,
        Err(e) => panic!("failed to parse '{}': {}", input, e),
    }
}

/// Parse input and assert it fails, returning the error.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> SyntaxError {
    match parse(input) {
        Ok(ast) => panic!("expected parse error for '{}', but got: {:?}", input, ast.node),
        Err(e) => e,
    }
}

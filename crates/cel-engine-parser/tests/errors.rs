//! Error reporting tests for the public parse() API.

mod common;

use cel_engine_parser::{parse_with_options, ParseOptions, SyntaxError};
use common::assert_parse_error;
use rstest::rstest;

#[rstest]
#[case::unclosed_parenthesis("(1 + 2")]
#[case::unclosed_bracket("[1, 2")]
#[case::unclosed_brace("{\"a\": 1")]
#[case::missing_operator("1 2")]
#[case::trailing_operator("1 +")]
#[case::empty_input("")]
#[case::whitespace_only("   // just a comment")]
#[case::incomplete_ternary("a ? b")]
#[case::two_words("invalid expression")]
#[case::dangling_dot("a.")]
#[case::missing_map_colon("{\"a\" 1}")]
#[case::reserved_if("if")]
#[case::reserved_in_operand("x + for")]
#[case::reserved_let("let")]
fn rejects_malformed_source(#[case] source: &str) {
    assert!(matches!(assert_parse_error(source), SyntaxError::Parse(_)));
}

#[rstest]
#[case::unclosed_string("\"hello", "unterminated string literal")]
#[case::bad_escape(r#""\z""#, "invalid escape sequence")]
#[case::stray_character("a @ b", "unexpected character '@'")]
#[case::int_overflow("9223372036854775808", "integer literal out of range: 9223372036854775808")]
fn reports_lex_errors(#[case] source: &str, #[case] message: &str) {
    let err = assert_parse_error(source);
    assert!(matches!(err, SyntaxError::Lex(_)), "expected lex error, got {:?}", err);
    assert_eq!(err.message(), message);
}

#[test]
fn error_has_span_information() {
    let err = assert_parse_error("1 +");
    assert_eq!(err.span(), 3..3);
    assert_eq!(err.to_string(), "unexpected end of input at 3..3");
}

#[test]
fn error_points_at_offending_token() {
    let err = assert_parse_error("a + ) b");
    assert_eq!(err.span(), 4..5);
    assert_eq!(err.message(), "unexpected token ')'");
}

#[test]
fn reserved_word_message_names_the_word() {
    let err = assert_parse_error("while");
    assert_eq!(
        err.message(),
        "'while' is a reserved word and cannot be used as an identifier"
    );
}

#[test]
fn nesting_limit_is_configurable() {
    let source = format!("{}true{}", "[".repeat(8), "]".repeat(8));
    assert!(parse_with_options(&source, ParseOptions { max_depth: 16 }).is_ok());

    let err = parse_with_options(&source, ParseOptions { max_depth: 4 }).unwrap_err();
    assert_eq!(
        err.message(),
        "expression nesting exceeds maximum depth of 4"
    );
}

fn or_chain(clauses: usize) -> String {
    (0..clauses)
        .map(|i| format!("x == {}", i))
        .collect::<Vec<_>>()
        .join(" || ")
}

#[test]
fn long_operator_chains_hit_the_nesting_limit() {
    assert!(common::assert_parses(&or_chain(200)).id > 0);

    let err = assert_parse_error(&or_chain(1000));
    assert!(matches!(err, SyntaxError::Parse(_)));
    assert_eq!(
        err.message(),
        "expression nesting exceeds maximum depth of 250"
    );
}

#[rstest]
#[case::addition("1 + 2 - 3")]
#[case::multiplication("2 * 3 / 4 % 5")]
#[case::conjunction("a && b")]
#[case::relation("a < b")]
#[case::member_access("a.b.c")]
#[case::index("a[0][1]")]
fn chain_height_is_bounded(#[case] unit: &str) {
    let short = vec![unit; 10].join(" + ");
    assert!(parse_with_options(&short, ParseOptions { max_depth: 64 }).is_ok());

    let long = vec![unit; 100].join(" + ");
    let err = parse_with_options(&long, ParseOptions { max_depth: 64 }).unwrap_err();
    assert_eq!(
        err.message(),
        "expression nesting exceeds maximum depth of 64"
    );
}

#[test]
fn grouped_chains_add_up() {
    let inner = vec!["x"; 40].join(" + ");
    let grouped = format!("({}) * {}", inner, vec!["y"; 40].join(" * "));
    assert!(parse_with_options(&grouped, ParseOptions { max_depth: 100 }).is_ok());

    let err = parse_with_options(&grouped, ParseOptions { max_depth: 60 }).unwrap_err();
    assert_eq!(
        err.message(),
        "expression nesting exceeds maximum depth of 60"
    );
}

#[test]
fn postfix_chains_are_bounded() {
    let source = format!("a{}", ".b".repeat(100));
    assert!(parse_with_options(&source, ParseOptions { max_depth: 128 }).is_ok());
    assert!(parse_with_options(&source, ParseOptions { max_depth: 64 }).is_err());
}

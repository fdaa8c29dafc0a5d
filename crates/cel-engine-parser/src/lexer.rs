//! CEL lexer using logos.

use logos::Logos;
use thiserror::Error;

/// A span in the source input (byte offsets).
pub type Span = std::ops::Range<usize>;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// Lexer error with span information.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Failure categories reported by token callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    NewlineInString,
    InvalidEscape,
    IntegerOutOfRange,
    InvalidFloat,
}

/// CEL tokens.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Hex unsigned: 0x1Fu, 0X1FU
    #[regex(r"0[xX][0-9a-fA-F]+[uU]", lex_hex_uint)]
    // Decimal unsigned: 123u, 123U
    #[regex(r"[0-9]+[uU]", lex_decimal_uint, priority = 4)]
    UInt(u64),

    #[regex(r"0[xX][0-9a-fA-F]+", lex_hex_int, priority = 3)]
    #[regex(r"[0-9]+", lex_decimal_int, priority = 1)]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", lex_float, priority = 5)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_float, priority = 2)]
    Float(f64),

    // Opening delimiter only; the callback scans the body.
    #[regex(r#"[rR]?("""|'''|"|')"#, lex_string)]
    String(String),

    #[regex(r#"([bB][rR]?|[rR][bB])("""|'''|"|')"#, lex_bytes)]
    Bytes(Vec<u8>),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    #[token("as", |_| "as".to_string())]
    #[token("break", |_| "break".to_string())]
    #[token("const", |_| "const".to_string())]
    #[token("continue", |_| "continue".to_string())]
    #[token("else", |_| "else".to_string())]
    #[token("for", |_| "for".to_string())]
    #[token("function", |_| "function".to_string())]
    #[token("if", |_| "if".to_string())]
    #[token("import", |_| "import".to_string())]
    #[token("let", |_| "let".to_string())]
    #[token("loop", |_| "loop".to_string())]
    #[token("package", |_| "package".to_string())]
    #[token("namespace", |_| "namespace".to_string())]
    #[token("return", |_| "return".to_string())]
    #[token("var", |_| "var".to_string())]
    #[token("void", |_| "void".to_string())]
    #[token("while", |_| "while".to_string())]
    Reserved(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 0)]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{}", n),
            Token::UInt(n) => write!(f, "{}u", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::In => write!(f, "in"),
            Token::Reserved(s) | Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
        }
    }
}

// === Numbers ===

fn lex_decimal_int(lex: &mut logos::Lexer<Token>) -> Result<i64, LexErrorKind> {
    lex.slice()
        .parse()
        .map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn lex_decimal_uint(lex: &mut logos::Lexer<Token>) -> Result<u64, LexErrorKind> {
    let s = lex.slice();
    s[..s.len() - 1]
        .parse()
        .map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn lex_hex_int(lex: &mut logos::Lexer<Token>) -> Result<i64, LexErrorKind> {
    i64::from_str_radix(&lex.slice()[2..], 16).map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn lex_hex_uint(lex: &mut logos::Lexer<Token>) -> Result<u64, LexErrorKind> {
    let s = lex.slice();
    u64::from_str_radix(&s[2..s.len() - 1], 16).map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> Result<f64, LexErrorKind> {
    lex.slice().parse().map_err(|_| LexErrorKind::InvalidFloat)
}

// === Strings and bytes ===

/// Destination for decoded literal content.
///
/// Strings treat `\xHH` and octal escapes as code points, bytes treat them
/// as raw octets.
trait LiteralSink {
    fn push_char(&mut self, c: char);
    fn push_octet(&mut self, b: u8);
}

impl LiteralSink for String {
    fn push_char(&mut self, c: char) {
        self.push(c);
    }

    fn push_octet(&mut self, b: u8) {
        self.push(char::from(b));
    }
}

impl LiteralSink for Vec<u8> {
    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn push_octet(&mut self, b: u8) {
        self.push(b);
    }
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Result<String, LexErrorKind> {
    let mut out = String::new();
    scan_literal(lex, &mut out)?;
    Ok(out)
}

fn lex_bytes(lex: &mut logos::Lexer<Token>) -> Result<Vec<u8>, LexErrorKind> {
    let mut out = Vec::new();
    scan_literal(lex, &mut out)?;
    Ok(out)
}

/// Scan the body of a quoted literal whose opening delimiter (with any
/// `r`/`b` prefix) has already been matched.
fn scan_literal<S: LiteralSink>(
    lex: &mut logos::Lexer<Token>,
    out: &mut S,
) -> Result<(), LexErrorKind> {
    let opener = lex.slice();
    let raw = opener.contains(['r', 'R']);
    let delimiter = opener.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let multiline = delimiter.len() == 3;

    let remainder = lex.remainder();
    let mut chars = remainder.char_indices();

    while let Some((i, c)) = chars.next() {
        if remainder[i..].starts_with(delimiter) {
            lex.bump(i + delimiter.len());
            return Ok(());
        }
        match c {
            '\\' if !raw => decode_escape(&mut chars, out)?,
            '\n' if !multiline => return Err(LexErrorKind::NewlineInString),
            _ => out.push_char(c),
        }
    }

    Err(LexErrorKind::UnterminatedString)
}

fn decode_escape<S: LiteralSink>(
    chars: &mut std::str::CharIndices<'_>,
    out: &mut S,
) -> Result<(), LexErrorKind> {
    let (_, c) = chars.next().ok_or(LexErrorKind::UnterminatedString)?;
    let simple = match c {
        '\\' => '\\',
        '/' => '/',
        '"' => '"',
        '\'' => '\'',
        '`' => '`',
        '?' => '?',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        'x' | 'X' => {
            out.push_octet(take_digits(chars, 2, 16, 0)? as u8);
            return Ok(());
        }
        'u' => return push_code_point(out, take_digits(chars, 4, 16, 0)?),
        'U' => return push_code_point(out, take_digits(chars, 8, 16, 0)?),
        '0'..='3' => {
            let first = c.to_digit(8).unwrap_or_default();
            out.push_octet(take_digits(chars, 2, 8, first)? as u8);
            return Ok(());
        }
        _ => return Err(LexErrorKind::InvalidEscape),
    };
    out.push_char(simple);
    Ok(())
}

fn take_digits(
    chars: &mut std::str::CharIndices<'_>,
    count: usize,
    radix: u32,
    seed: u32,
) -> Result<u32, LexErrorKind> {
    let mut value = seed;
    for _ in 0..count {
        let (_, c) = chars.next().ok_or(LexErrorKind::InvalidEscape)?;
        let digit = c.to_digit(radix).ok_or(LexErrorKind::InvalidEscape)?;
        value = value * radix + digit;
    }
    Ok(value)
}

fn push_code_point<S: LiteralSink>(out: &mut S, value: u32) -> Result<(), LexErrorKind> {
    let c = char::from_u32(value).ok_or(LexErrorKind::InvalidEscape)?;
    out.push_char(c);
    Ok(())
}

// === Public Lexer API ===

fn describe(kind: LexErrorKind, slice: &str) -> String {
    match kind {
        LexErrorKind::UnexpectedCharacter => format!("unexpected character '{}'", slice),
        LexErrorKind::UnterminatedString => "unterminated string literal".to_string(),
        LexErrorKind::NewlineInString => "newline in single-line string literal".to_string(),
        LexErrorKind::InvalidEscape => "invalid escape sequence".to_string(),
        LexErrorKind::IntegerOutOfRange => format!("integer literal out of range: {}", slice),
        LexErrorKind::InvalidFloat => format!("invalid floating point literal: {}", slice),
    }
}

/// Tokenize the input string.
///
/// Stops at the first invalid token.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(kind) => {
                return Err(LexError {
                    message: describe(kind, lexer.slice()),
                    span,
                })
            }
        }
    }

    Ok(tokens)
}

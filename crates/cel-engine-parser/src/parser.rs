//! CEL parser - hand-written recursive descent over the token stream.

use thiserror::Error;

use crate::ast::{BinaryOp, Expr, Spanned, SpannedExpr, UnaryOp};
use crate::lexer::{Span, SpannedToken, Token};

/// Default limit on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 250;

/// Parse error with span information.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting depth. Bounds both parser recursion and the height
    /// of the resulting tree.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Recursive descent parser for CEL expressions.
///
/// Parsing stops at the first error; there is no recovery.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Counter for generating unique node IDs (starts at 1)
    next_id: i64,
    depth: usize,
    /// Height of each finished node's subtree, indexed by `id - 1`.
    heights: Vec<usize>,
    options: ParseOptions,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self::with_options(tokens, ParseOptions::default())
    }

    pub fn with_options(tokens: &'a [SpannedToken], options: ParseOptions) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 1,
            depth: 0,
            heights: Vec::new(),
            options,
        }
    }

    /// Allocate the next unique node ID.
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Build a node, rejecting it if its subtree is taller than `max_depth`.
    ///
    /// Operator chains are folded in loops rather than by recursion, so
    /// the parse depth alone does not bound the height of the tree.
    fn node(&mut self, expr: Expr, span: Span) -> Result<SpannedExpr, ParseError> {
        let height = self.child_height(&expr) + 1;
        if height > self.options.max_depth {
            return Err(self.depth_exceeded(span));
        }
        self.heights.push(height);
        Ok(Spanned::new(self.next_id(), expr, span))
    }

    fn height_of(&self, expr: &SpannedExpr) -> usize {
        usize::try_from(expr.id - 1)
            .ok()
            .and_then(|i| self.heights.get(i))
            .copied()
            .unwrap_or(0)
    }

    fn child_height(&self, expr: &Expr) -> usize {
        match expr {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::UInt(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Bytes(_)
            | Expr::Ident(_)
            | Expr::RootIdent(_) => 0,
            Expr::List(items) => items.iter().map(|e| self.height_of(e)).max().unwrap_or(0),
            Expr::Map(entries) => entries
                .iter()
                .map(|(k, v)| self.height_of(k).max(self.height_of(v)))
                .max()
                .unwrap_or(0),
            Expr::Unary { expr, .. } | Expr::Member { expr, .. } => self.height_of(expr),
            Expr::Binary { left, right, .. } => self.height_of(left).max(self.height_of(right)),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self
                .height_of(cond)
                .max(self.height_of(then_expr))
                .max(self.height_of(else_expr)),
            Expr::Index { expr, index } => self.height_of(expr).max(self.height_of(index)),
            Expr::Call { expr, args } => args
                .iter()
                .map(|e| self.height_of(e))
                .fold(self.height_of(expr), usize::max),
            Expr::Struct { type_name, fields } => fields
                .iter()
                .map(|(_, e)| self.height_of(e))
                .fold(self.height_of(type_name), usize::max),
        }
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Get the span of the current token.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// Advance to the next token, returning the current one.
    fn advance(&mut self) -> Option<&'a SpannedToken> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Consume the current token if it matches, returning true if consumed.
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::new(
                format!("expected '{}', found {}", token, self.describe_current()),
                self.peek_span(),
            ))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                let span = self.peek_span();
                self.advance();
                Ok((name, span))
            }
            _ => Err(ParseError::new(
                format!("expected {}, found {}", context, self.describe_current()),
                self.peek_span(),
            )),
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(self.depth_exceeded(self.peek_span()));
        }
        Ok(())
    }

    fn depth_exceeded(&self, span: Span) -> ParseError {
        ParseError::new(
            format!(
                "expression nesting exceeds maximum depth of {}",
                self.options.max_depth
            ),
            span,
        )
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.descend()?;
        let result = self.parse_ternary();
        self.depth -= 1;
        result
    }

    /// Parse ternary conditional: expr ? expr : expr
    fn parse_ternary(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_or()?;

        if !self.match_token(&Token::Question) {
            return Ok(cond);
        }

        let then_expr = self.parse_or()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_expr()?;
        let span = cond.span.start..else_expr.span.end;

        self.node(
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        )
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: SpannedExpr,
        right: SpannedExpr,
    ) -> Result<SpannedExpr, ParseError> {
        let span = left.span.start..right.span.end;
        self.node(
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    /// Parse logical OR: expr || expr
    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_and()?;
        while self.match_token(&Token::Or) {
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    /// Parse logical AND: expr && expr
    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_relation()?;
        while self.match_token(&Token::And) {
            let right = self.parse_relation()?;
            left = self.binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    /// Parse relational operators: == != < <= > >= in
    fn parse_relation(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_addition()?;
        while let Some(op) = self.peek_relop() {
            self.advance();
            let right = self.parse_addition()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn peek_relop(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::In => Some(BinaryOp::In),
            _ => None,
        }
    }

    /// Parse additive operators: + -
    fn parse_addition(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_mult()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mult()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    /// Parse multiplicative operators: * / %
    fn parse_mult(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    /// Parse unary operators: - !
    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.peek_span().start;
        self.advance();

        self.descend()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        let operand = operand?;

        let span = start..operand.span.end;
        self.node(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        )
    }

    /// Parse postfix operators: . [] () {}
    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            expr = match self.peek() {
                Some(Token::LParen) => self.parse_call(expr)?,
                Some(Token::LBracket) => self.parse_index(expr)?,
                Some(Token::Dot) => self.parse_member(expr)?,
                Some(Token::LBrace) if is_type_expr(&expr) => self.parse_struct_init(expr)?,
                _ => break,
            };
        }

        Ok(expr)
    }

    /// Parse a comma separated sequence up to `close`, allowing a trailing comma.
    fn parse_sequence<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<(Vec<T>, Span), ParseError> {
        let mut items = Vec::new();
        if !self.check(close) {
            items.push(item(self)?);
            while self.match_token(&Token::Comma) {
                if self.check(close) {
                    break;
                }
                items.push(item(self)?);
            }
        }
        let end = self.expect(close)?;
        Ok((items, end))
    }

    /// Parse a function call: expr(args...)
    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        if !matches!(callee.node, Expr::Ident(_) | Expr::Member { .. }) {
            return Err(ParseError::new(
                "only named functions and methods can be called",
                self.peek_span(),
            ));
        }
        let start = callee.span.start;
        self.expect(&Token::LParen)?;
        let (args, end) = self.parse_sequence(&Token::RParen, Self::parse_expr)?;

        self.node(
            Expr::Call {
                expr: Box::new(callee),
                args,
            },
            start..end.end,
        )
    }

    /// Parse an index operation: expr[index]
    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end = self.expect(&Token::RBracket)?;

        self.node(
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end.end,
        )
    }

    /// Parse member access: expr.field
    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;
        let (field, field_span) = self.expect_ident("identifier after '.'")?;

        self.node(
            Expr::Member {
                expr: Box::new(base),
                field,
            },
            start..field_span.end,
        )
    }

    /// Parse struct initialization: Type{field: value, ...}
    fn parse_struct_init(&mut self, type_name: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = type_name.span.start;
        self.expect(&Token::LBrace)?;
        let (fields, end) = self.parse_sequence(&Token::RBrace, |p| {
            let (name, _) = p.expect_ident("field name")?;
            p.expect(&Token::Colon)?;
            Ok((name, p.parse_expr()?))
        })?;

        self.node(
            Expr::Struct {
                type_name: Box::new(type_name),
                fields,
            },
            start..end.end,
        )
    }

    /// Parse an atom: literal, identifier, parenthesized expression, list, or map.
    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let tokens = self.tokens;
        let Some((token, _)) = tokens.get(self.pos) else {
            return Err(ParseError::new("unexpected end of input", self.eof_span()));
        };

        let literal = match token {
            Token::Int(n) => Some(Expr::Int(*n)),
            Token::UInt(n) => Some(Expr::UInt(*n)),
            Token::Float(n) => Some(Expr::Float(*n)),
            Token::String(s) => Some(Expr::String(s.clone())),
            Token::Bytes(b) => Some(Expr::Bytes(b.clone())),
            Token::True => Some(Expr::Bool(true)),
            Token::False => Some(Expr::Bool(false)),
            Token::Null => Some(Expr::Null),
            Token::Ident(name) => Some(Expr::Ident(name.clone())),
            _ => None,
        };
        if let Some(expr) = literal {
            self.advance();
            return self.node(expr, span);
        }

        match token {
            Token::Reserved(word) => Err(ParseError::new(
                format!(
                    "'{}' is a reserved word and cannot be used as an identifier",
                    word
                ),
                span,
            )),
            Token::Dot => {
                self.advance();
                let (name, name_span) = self.expect_ident("identifier after '.'")?;
                self.node(Expr::RootIdent(name), span.start..name_span.end)
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                let (items, end) = self.parse_sequence(&Token::RBracket, Self::parse_expr)?;
                self.node(Expr::List(items), span.start..end.end)
            }
            Token::LBrace => {
                self.advance();
                let (entries, end) = self.parse_sequence(&Token::RBrace, |p| {
                    let key = p.parse_expr()?;
                    p.expect(&Token::Colon)?;
                    Ok((key, p.parse_expr()?))
                })?;
                self.node(Expr::Map(entries), span.start..end.end)
            }
            token => Err(ParseError::new(
                format!("unexpected token '{}'", token),
                span,
            )),
        }
    }
}

/// Check if the expression can be used as a type name for struct literals.
fn is_type_expr(expr: &SpannedExpr) -> bool {
    matches!(
        expr.node,
        Expr::Ident(_) | Expr::RootIdent(_) | Expr::Member { .. }
    )
}

/// Parse a complete token stream into a single expression.
pub fn parse_tokens(
    tokens: &[SpannedToken],
    options: ParseOptions,
) -> Result<SpannedExpr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::new("empty input", 0..0));
    }

    let mut parser = Parser::with_options(tokens, options);
    let ast = parser.parse_expr()?;
    if !parser.at_end() {
        return Err(ParseError::new(
            format!(
                "unexpected {} after expression",
                parser.describe_current()
            ),
            parser.peek_span(),
        ));
    }
    Ok(ast)
}

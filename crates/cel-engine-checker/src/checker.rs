//! AST to IR translation.
//!
//! The checker walks a parsed expression once, expanding macros, binding
//! comprehension variables, fixing function dispatch targets and validating
//! everything that can be validated without a runtime context. Identifiers
//! that are not bound by a macro are deferred to evaluation.

use std::collections::HashSet;
use std::sync::Arc;

use cel_engine_parser::{BinaryOp, Expr, SpannedExpr};
use regex::Regex;

use crate::errors::{CompileError, CompileErrorKind};
use crate::ir::{Call, Constant, Function, Node, NodeKind, Pattern};
use crate::macros::{self, MacroCall, MacroStyle};
use crate::scope::{Scope, ScopeStack};
use crate::standard_library::{self, Builtin};

/// Checker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Expand the standard macros. When disabled, macro names are compiled
    /// as ordinary calls and fail at evaluation.
    pub macros: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { macros: true }
    }
}

/// Translates an AST into IR.
#[derive(Debug, Default)]
pub struct Checker {
    scopes: ScopeStack,
    options: CheckOptions,
}

impl Checker {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            scopes: ScopeStack::new(),
            options,
        }
    }

    /// Check a complete expression.
    pub fn check(&mut self, expr: &SpannedExpr) -> Result<Node, CompileError> {
        self.check_expr(expr)
    }

    /// Run `f` with `scope` pushed, popping it again afterwards.
    pub(crate) fn check_in_scope<T>(
        &mut self,
        scope: Scope,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.scopes.enter_scope(scope);
        let result = f(self);
        self.scopes.exit_scope();
        result
    }

    pub(crate) fn check_expr(&mut self, expr: &SpannedExpr) -> Result<Node, CompileError> {
        let span = expr.span.clone();
        let kind = match &expr.node {
            Expr::Null => NodeKind::Constant(Constant::Null),
            Expr::Bool(b) => NodeKind::Constant(Constant::Bool(*b)),
            Expr::Int(n) => NodeKind::Constant(Constant::Int(*n)),
            Expr::UInt(n) => NodeKind::Constant(Constant::UInt(*n)),
            Expr::Float(f) => NodeKind::Constant(Constant::Double(*f)),
            Expr::String(s) => NodeKind::Constant(Constant::String(Arc::from(s.as_str()))),
            Expr::Bytes(b) => NodeKind::Constant(Constant::Bytes(Arc::from(b.as_slice()))),

            Expr::Ident(name) => match self.scopes.resolve(name) {
                Some(depth) => NodeKind::Local {
                    name: Arc::from(name.as_str()),
                    depth,
                },
                None => NodeKind::Ident(Arc::from(name.as_str())),
            },
            Expr::RootIdent(name) => NodeKind::Ident(Arc::from(name.as_str())),

            Expr::List(items) => NodeKind::List(
                items
                    .iter()
                    .map(|item| self.check_expr(item))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Map(entries) => {
                let mut checked = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    checked.push((self.check_expr(key)?, self.check_expr(value)?));
                }
                NodeKind::Map(checked)
            }
            Expr::Struct { type_name, fields } => {
                let name = type_name.node.qualified_name().ok_or_else(|| {
                    CompileError::new(
                        CompileErrorKind::InvalidStructType,
                        type_name.span.clone(),
                        type_name.id,
                    )
                })?;
                let mut seen = HashSet::new();
                let mut checked = Vec::with_capacity(fields.len());
                for (field, value) in fields {
                    if !seen.insert(field.as_str()) {
                        return Err(CompileError::new(
                            CompileErrorKind::DuplicateField {
                                field: field.clone(),
                            },
                            value.span.clone(),
                            value.id,
                        ));
                    }
                    checked.push((Arc::from(field.as_str()), self.check_expr(value)?));
                }
                NodeKind::Struct {
                    type_name: Arc::from(name.trim_start_matches('.')),
                    fields: checked,
                }
            }

            Expr::Unary { op, expr: operand } => NodeKind::Unary {
                op: *op,
                operand: Box::new(self.check_expr(operand)?),
            },
            Expr::Binary { op, left, right } => {
                let left = Box::new(self.check_expr(left)?);
                let right = Box::new(self.check_expr(right)?);
                match op {
                    BinaryOp::And => NodeKind::And(left, right),
                    BinaryOp::Or => NodeKind::Or(left, right),
                    op => NodeKind::Binary {
                        op: *op,
                        left,
                        right,
                    },
                }
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => NodeKind::Conditional {
                cond: Box::new(self.check_expr(cond)?),
                then_branch: Box::new(self.check_expr(then_expr)?),
                else_branch: Box::new(self.check_expr(else_expr)?),
            },

            Expr::Member { expr: operand, field } => NodeKind::Select {
                operand: Box::new(self.check_expr(operand)?),
                field: Arc::from(field.as_str()),
            },
            Expr::Index { expr: operand, index } => NodeKind::Index {
                operand: Box::new(self.check_expr(operand)?),
                index: Box::new(self.check_expr(index)?),
            },
            Expr::Call { expr: callee, args } => return self.check_call(expr, callee, args),
        };
        Ok(Node::new(kind, span))
    }

    fn check_call(
        &mut self,
        call: &SpannedExpr,
        callee: &SpannedExpr,
        args: &[SpannedExpr],
    ) -> Result<Node, CompileError> {
        let (name, receiver) = match &callee.node {
            Expr::Ident(name) => (name.as_str(), None),
            Expr::Member { expr, field } => (field.as_str(), Some(expr.as_ref())),
            // The parser only produces calls on names.
            _ => ("", None),
        };

        if self.options.macros {
            let style = if receiver.is_some() {
                MacroStyle::Receiver
            } else {
                MacroStyle::Global
            };
            if let Some(def) = macros::lookup(name, style) {
                if !def.arg_count.matches(args.len()) {
                    return Err(CompileError::new(
                        CompileErrorKind::MacroArgumentCount {
                            name: name.to_string(),
                            expected: def.arg_count,
                            actual: args.len(),
                        },
                        call.span.clone(),
                        call.id,
                    ));
                }
                let invocation = MacroCall {
                    name: def.name,
                    id: call.id,
                    span: call.span.clone(),
                    receiver,
                    args,
                };
                return (def.expander)(self, &invocation);
            }
        }

        let mut checked = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = receiver {
            checked.push(self.check_expr(receiver)?);
        }
        for arg in args {
            checked.push(self.check_expr(arg)?);
        }

        let Some(decl) = standard_library::lookup(name) else {
            return Ok(Node::new(
                NodeKind::Call(Call {
                    function: Function::Unknown(Arc::from(name)),
                    args: checked,
                }),
                call.span.clone(),
            ));
        };

        let error = |kind| CompileError::new(kind, call.span.clone(), call.id);
        if receiver.is_some() && !decl.style.allows_receiver() {
            return Err(error(CompileErrorKind::ReceiverNotAllowed {
                function: name.to_string(),
            }));
        }
        if receiver.is_none() && !decl.style.allows_global() {
            return Err(error(CompileErrorKind::ReceiverRequired {
                function: name.to_string(),
            }));
        }
        if !decl.args.matches(checked.len()) {
            return Err(error(CompileErrorKind::ArgumentCount {
                function: name.to_string(),
                expected: decl.args,
                actual: checked.len(),
            }));
        }

        if decl.builtin == Builtin::Matches {
            return matches_node(call, checked);
        }

        Ok(Node::new(
            NodeKind::Call(Call {
                function: Function::Builtin(decl.builtin),
                args: checked,
            }),
            call.span.clone(),
        ))
    }
}

/// Build a `matches` node, compiling a literal pattern up front.
fn matches_node(call: &SpannedExpr, args: Vec<Node>) -> Result<Node, CompileError> {
    let mut args = args.into_iter();
    let (Some(target), Some(pattern)) = (args.next(), args.next()) else {
        return Err(CompileError::new(
            CompileErrorKind::ArgumentCount {
                function: "matches".to_string(),
                expected: macros::ArgCount::Exact(2),
                actual: 0,
            },
            call.span.clone(),
            call.id,
        ));
    };

    let pattern = match &pattern.kind {
        NodeKind::Constant(Constant::String(source)) => {
            let regex = Regex::new(source).map_err(|e| {
                CompileError::new(
                    CompileErrorKind::InvalidRegex {
                        pattern: source.to_string(),
                        reason: e.to_string(),
                    },
                    pattern.span.clone(),
                    call.id,
                )
            })?;
            Pattern::Compiled(regex)
        }
        _ => Pattern::Dynamic(Box::new(pattern)),
    };

    Ok(Node::new(
        NodeKind::Matches {
            target: Box::new(target),
            pattern,
        },
        call.span.clone(),
    ))
}

/// Check an expression with default options.
pub fn check(expr: &SpannedExpr) -> Result<Node, CompileError> {
    Checker::new(CheckOptions::default()).check(expr)
}

/// Check an expression with the given options.
pub fn check_with_options(expr: &SpannedExpr, options: CheckOptions) -> Result<Node, CompileError> {
    Checker::new(options).check(expr)
}

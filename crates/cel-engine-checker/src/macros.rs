//! CEL macros.
//!
//! Macros are calls the checker rewrites instead of dispatching at run time.
//! `has(a.b)` becomes a presence test and the receiver-style collection
//! macros (`all`, `exists`, `exists_one`, `map`, `filter`) become
//! [`Comprehension`] nodes whose iteration variables are bound in a fresh
//! scope visible only to the macro body.

use std::fmt;
use std::sync::Arc;

use cel_engine_parser::{Expr, Span, SpannedExpr};

use crate::checker::Checker;
use crate::errors::{CompileError, CompileErrorKind};
use crate::ir::{Comprehension, ComprehensionKind, Node, NodeKind};
use crate::scope::Scope;

/// Indicates whether a macro is called as a global function or as a method on a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStyle {
    /// Global function call: `macro_name(args...)`
    Global,
    /// Receiver-style method call: `receiver.macro_name(args...)`
    Receiver,
}

/// Specifies the expected argument count for a macro or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    /// Exact number of arguments required.
    Exact(usize),
    /// Inclusive range of argument counts.
    Range(usize, usize),
    /// Variable arguments with a minimum count.
    AtLeast(usize),
}

impl ArgCount {
    /// Check if the given argument count matches this specification.
    pub fn matches(&self, count: usize) -> bool {
        match *self {
            ArgCount::Exact(n) => count == n,
            ArgCount::Range(min, max) => (min..=max).contains(&count),
            ArgCount::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for ArgCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ArgCount::Exact(n) => write!(f, "{}", n),
            ArgCount::Range(min, max) if max == min + 1 => write!(f, "{} or {}", min, max),
            ArgCount::Range(min, max) => write!(f, "{} to {}", min, max),
            ArgCount::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// A macro invocation as seen by an expander.
pub struct MacroCall<'a> {
    pub name: &'static str,
    pub id: i64,
    pub span: Span,
    pub receiver: Option<&'a SpannedExpr>,
    pub args: &'a [SpannedExpr],
}

impl MacroCall<'_> {
    fn error(&self, kind: CompileErrorKind, span: Span) -> CompileError {
        CompileError::new(kind, span, self.id)
    }

    fn target(&self) -> Result<&SpannedExpr, CompileError> {
        self.receiver.ok_or_else(|| {
            self.error(
                CompileErrorKind::ReceiverRequired {
                    function: self.name.to_string(),
                },
                self.span.clone(),
            )
        })
    }

    fn iteration_variable(&self, expr: &SpannedExpr) -> Result<Arc<str>, CompileError> {
        match &expr.node {
            Expr::Ident(name) => Ok(Arc::from(name.as_str())),
            _ => Err(self.error(
                CompileErrorKind::InvalidIterationVariable {
                    name: self.name.to_string(),
                },
                expr.span.clone(),
            )),
        }
    }

    /// Resolve the leading variable arguments: `(v)` or `(i, v)`.
    fn bindings(&self, vars: &[SpannedExpr]) -> Result<Bindings, CompileError> {
        match vars {
            [value] => Ok(Bindings {
                index_var: None,
                iter_var: self.iteration_variable(value)?,
            }),
            [index, value] => {
                let index_var = self.iteration_variable(index)?;
                let iter_var = self.iteration_variable(value)?;
                if index_var == iter_var {
                    return Err(self.error(
                        CompileErrorKind::DuplicateIterationVariable {
                            name: self.name.to_string(),
                            variable: iter_var.to_string(),
                        },
                        value.span.clone(),
                    ));
                }
                Ok(Bindings {
                    index_var: Some(index_var),
                    iter_var,
                })
            }
            _ => Err(self.error(
                CompileErrorKind::MacroArgumentCount {
                    name: self.name.to_string(),
                    expected: ArgCount::Range(2, 3),
                    actual: self.args.len(),
                },
                self.span.clone(),
            )),
        }
    }
}

struct Bindings {
    index_var: Option<Arc<str>>,
    iter_var: Arc<str>,
}

impl Bindings {
    fn scope(&self) -> Scope {
        Scope::new(self.index_var.iter().cloned().chain([self.iter_var.clone()]))
    }

    fn into_node(self, range: Node, kind: ComprehensionKind, span: Span) -> Node {
        Node::new(
            NodeKind::Comprehension(Box::new(Comprehension {
                range,
                index_var: self.index_var,
                iter_var: self.iter_var,
                kind,
            })),
            span,
        )
    }
}

/// Type alias for macro expander functions.
pub type MacroExpander = fn(&mut Checker, &MacroCall<'_>) -> Result<Node, CompileError>;

/// Definition of a single macro.
#[derive(Clone, Copy)]
pub struct Macro {
    /// The macro name (e.g., "all", "has", "map").
    pub name: &'static str,
    pub style: MacroStyle,
    pub arg_count: ArgCount,
    pub expander: MacroExpander,
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("arg_count", &self.arg_count)
            .finish()
    }
}

/// The standard CEL macros.
pub static STANDARD_MACROS: &[Macro] = &[
    Macro {
        name: "has",
        style: MacroStyle::Global,
        arg_count: ArgCount::Exact(1),
        expander: expand_has,
    },
    Macro {
        name: "all",
        style: MacroStyle::Receiver,
        arg_count: ArgCount::Range(2, 3),
        expander: expand_all,
    },
    Macro {
        name: "exists",
        style: MacroStyle::Receiver,
        arg_count: ArgCount::Range(2, 3),
        expander: expand_exists,
    },
    Macro {
        name: "exists_one",
        style: MacroStyle::Receiver,
        arg_count: ArgCount::Range(2, 3),
        expander: expand_exists_one,
    },
    Macro {
        name: "map",
        style: MacroStyle::Receiver,
        arg_count: ArgCount::Range(2, 3),
        expander: expand_map,
    },
    Macro {
        name: "filter",
        style: MacroStyle::Receiver,
        arg_count: ArgCount::Exact(2),
        expander: expand_filter,
    },
];

/// Look up a macro by name and call style.
pub fn lookup(name: &str, style: MacroStyle) -> Option<&'static Macro> {
    STANDARD_MACROS
        .iter()
        .find(|m| m.name == name && m.style == style)
}

fn expand_has(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    let arg = &call.args[0];
    match &arg.node {
        Expr::Member { expr, field } => {
            let operand = checker.check_expr(expr)?;
            Ok(Node::new(
                NodeKind::Has {
                    operand: Box::new(operand),
                    field: Arc::from(field.as_str()),
                },
                call.span.clone(),
            ))
        }
        _ => Err(call.error(CompileErrorKind::InvalidHasArgument, arg.span.clone())),
    }
}

/// Shared shape of `all`, `exists` and `exists_one`: variables then one predicate.
fn expand_predicate(
    checker: &mut Checker,
    call: &MacroCall<'_>,
    kind: fn(Node) -> ComprehensionKind,
) -> Result<Node, CompileError> {
    let target = call.target()?;
    let (vars, predicate) = call.args.split_at(call.args.len() - 1);
    let bindings = call.bindings(vars)?;

    let range = checker.check_expr(target)?;
    let predicate = checker.check_in_scope(bindings.scope(), |c| c.check_expr(&predicate[0]))?;

    Ok(bindings.into_node(range, kind(predicate), call.span.clone()))
}

fn expand_all(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    expand_predicate(checker, call, ComprehensionKind::All)
}

fn expand_exists(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    expand_predicate(checker, call, ComprehensionKind::Exists)
}

fn expand_exists_one(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    expand_predicate(checker, call, ComprehensionKind::ExistsOne)
}

fn expand_filter(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    expand_predicate(checker, call, ComprehensionKind::Filter)
}

/// `map(v, transform)` or `map(v, filter, transform)`.
fn expand_map(checker: &mut Checker, call: &MacroCall<'_>) -> Result<Node, CompileError> {
    let target = call.target()?;
    let (var, body) = call.args.split_at(1);
    let bindings = call.bindings(var)?;

    let range = checker.check_expr(target)?;
    let kind = checker.check_in_scope(bindings.scope(), |c| match body {
        [transform] => Ok(ComprehensionKind::Map {
            filter: None,
            transform: c.check_expr(transform)?,
        }),
        [filter, transform] => Ok(ComprehensionKind::Map {
            filter: Some(c.check_expr(filter)?),
            transform: c.check_expr(transform)?,
        }),
        _ => Err(call.error(
            CompileErrorKind::MacroArgumentCount {
                name: call.name.to_string(),
                expected: ArgCount::Range(2, 3),
                actual: call.args.len(),
            },
            call.span.clone(),
        )),
    })?;

    Ok(bindings.into_node(range, kind, call.span.clone()))
}

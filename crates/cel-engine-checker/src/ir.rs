//! Checked, evaluable representation of an expression.
//!
//! An IR tree is immutable once built. Identifiers bound by macros are
//! resolved to [`NodeKind::Local`] slots, everything else that names a
//! variable is left as [`NodeKind::Ident`] and looked up at evaluation time.

use std::collections::BTreeSet;
use std::sync::Arc;

use cel_engine_parser::{BinaryOp, Span, UnaryOp};
use regex::Regex;

use crate::standard_library::Builtin;

/// A node in the checked expression tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Literal values known at check time.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Constant(Constant),
    /// Free variable, resolved against the activation.
    Ident(Arc<str>),
    /// Macro-bound variable. `depth` counts bindings outward from the
    /// innermost one, so 0 is the most recently bound name.
    Local { name: Arc<str>, depth: usize },
    Select {
        operand: Box<Node>,
        field: Arc<str>,
    },
    /// Presence test produced by `has(operand.field)`.
    Has {
        operand: Box<Node>,
        field: Arc<str>,
    },
    Index {
        operand: Box<Node>,
        index: Box<Node>,
    },
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
    Struct {
        type_name: Arc<str>,
        fields: Vec<(Arc<str>, Node)>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    /// Strict binary operator. Never `And` or `Or`.
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Conditional {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    Call(Call),
    Matches {
        target: Box<Node>,
        pattern: Pattern,
    },
    Comprehension(Box<Comprehension>),
}

/// A function call with its dispatch target fixed at check time.
///
/// For receiver-style calls the receiver is the first argument.
#[derive(Debug, Clone)]
pub struct Call {
    pub function: Function,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Builtin(Builtin),
    /// A name with no standard library binding; fails when evaluated.
    Unknown(Arc<str>),
}

/// The regular expression operand of `matches`.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal pattern compiled during checking.
    Compiled(Regex),
    Dynamic(Box<Node>),
}

/// Loop description for a desugared macro.
#[derive(Debug, Clone)]
pub struct Comprehension {
    pub range: Node,
    /// Index (lists) or key (maps) variable of the two-variable forms.
    pub index_var: Option<Arc<str>>,
    pub iter_var: Arc<str>,
    pub kind: ComprehensionKind,
}

/// Accumulation policy of a comprehension.
#[derive(Debug, Clone)]
pub enum ComprehensionKind {
    /// Stops at the first element whose predicate is false.
    All(Node),
    /// Stops at the first element whose predicate is true.
    Exists(Node),
    ExistsOne(Node),
    /// Collects transformed elements in source order.
    Map {
        filter: Option<Node>,
        transform: Node,
    },
    /// Collects source elements satisfying the predicate, in source order.
    Filter(Node),
}

impl Comprehension {
    /// Number of bindings this comprehension introduces for its body.
    pub fn binding_count(&self) -> usize {
        if self.index_var.is_some() {
            2
        } else {
            1
        }
    }
}

impl Node {
    /// Names of the free variables this expression reads, sorted.
    pub fn references(&self) -> BTreeSet<Arc<str>> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut BTreeSet<Arc<str>>) {
        match &self.kind {
            NodeKind::Ident(name) => {
                names.insert(name.clone());
            }
            NodeKind::Constant(_) | NodeKind::Local { .. } => {}
            NodeKind::Select { operand, .. }
            | NodeKind::Has { operand, .. }
            | NodeKind::Unary { operand, .. } => operand.collect_references(names),
            NodeKind::Index { operand, index } => {
                operand.collect_references(names);
                index.collect_references(names);
            }
            NodeKind::List(items) => items.iter().for_each(|n| n.collect_references(names)),
            NodeKind::Map(entries) => {
                for (k, v) in entries {
                    k.collect_references(names);
                    v.collect_references(names);
                }
            }
            NodeKind::Struct { fields, .. } => {
                fields.iter().for_each(|(_, n)| n.collect_references(names))
            }
            NodeKind::Binary { left, right, .. }
            | NodeKind::And(left, right)
            | NodeKind::Or(left, right) => {
                left.collect_references(names);
                right.collect_references(names);
            }
            NodeKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.collect_references(names);
                then_branch.collect_references(names);
                else_branch.collect_references(names);
            }
            NodeKind::Call(call) => call.args.iter().for_each(|n| n.collect_references(names)),
            NodeKind::Matches { target, pattern } => {
                target.collect_references(names);
                if let Pattern::Dynamic(p) = pattern {
                    p.collect_references(names);
                }
            }
            NodeKind::Comprehension(c) => {
                c.range.collect_references(names);
                match &c.kind {
                    ComprehensionKind::All(body)
                    | ComprehensionKind::Exists(body)
                    | ComprehensionKind::ExistsOne(body)
                    | ComprehensionKind::Filter(body) => body.collect_references(names),
                    ComprehensionKind::Map { filter, transform } => {
                        if let Some(f) = filter {
                            f.collect_references(names);
                        }
                        transform.collect_references(names);
                    }
                }
            }
        }
    }
}

//! Tree-walking evaluator for checked CEL expressions.
//!
//! The evaluator walks an IR tree depth-first against an activation. It
//! never mutates the tree; comprehension variables live in a chain of stack
//! frames that is dropped as each macro body finishes.
//!
//! - Arithmetic, comparison and membership operators
//! - Short-circuit `&&`, `||` and `?:`, with CEL's commutative error rule
//! - Built-in calls via [`functions`](super::functions)
//! - Comprehensions for `all`, `exists`, `exists_one`, `map` and `filter`
//! - Unknown propagation

use std::cmp::Ordering;
use std::sync::Arc;

use cel_engine_checker::{
    Call, Comprehension, ComprehensionKind, Constant, Function, Node, NodeKind, Pattern,
};
use cel_engine_parser::{BinaryOp, UnaryOp};
use regex::Regex;

use super::functions;
use super::value::compare_numeric;
use super::{
    Activation, Duration, EvalError, MapKey, StructValue, Timestamp, UnknownSet, Value, ValueMap,
};

/// One comprehension binding. Frames link outward to the enclosing ones.
struct Frame<'a> {
    value: Value,
    parent: Option<&'a Frame<'a>>,
}

/// The CEL expression evaluator.
pub struct Evaluator<'a> {
    activation: &'a dyn Activation,
    locals: Option<&'a Frame<'a>>,
}

/// Merge every unknown among `values`, if there is one.
fn merge_unknowns<'v>(values: impl IntoIterator<Item = &'v Value>) -> Option<Value> {
    let mut merged: Option<UnknownSet> = None;
    for value in values {
        if let Value::Unknown(u) = value {
            merged.get_or_insert_with(UnknownSet::default).merge(u);
        }
    }
    merged.map(|u| Value::Unknown(Arc::new(u)))
}

impl<'a> Evaluator<'a> {
    pub fn new(activation: &'a dyn Activation) -> Self {
        Self {
            activation,
            locals: None,
        }
    }

    /// Evaluate an expression.
    pub fn eval(&self, node: &Node) -> Result<Value, EvalError> {
        self.eval_node(node)
    }

    fn eval_node(&self, node: &Node) -> Result<Value, EvalError> {
        self.eval_kind(&node.kind)
            .map_err(|e| e.with_span(node.span.clone()))
    }

    fn eval_kind(&self, kind: &NodeKind) -> Result<Value, EvalError> {
        match kind {
            NodeKind::Constant(c) => Ok(constant_value(c)),
            NodeKind::Ident(name) => self.eval_ident(name),
            NodeKind::Local { name, depth } => self.eval_local(name, *depth),
            NodeKind::Select { operand, field } => self.eval_select(operand, field),
            NodeKind::Has { operand, field } => self.eval_has(operand, field),
            NodeKind::Index { operand, index } => self.eval_index(operand, index),
            NodeKind::List(items) => self.eval_list(items),
            NodeKind::Map(entries) => self.eval_map(entries),
            NodeKind::Struct { type_name, fields } => self.eval_struct(type_name, fields),
            NodeKind::Unary { op, operand } => self.eval_unary_expr(*op, operand),
            NodeKind::Binary { op, left, right } => self.eval_binary_expr(*op, left, right),
            NodeKind::And(left, right) => self.eval_logical(left, right, false),
            NodeKind::Or(left, right) => self.eval_logical(left, right, true),
            NodeKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => self.eval_conditional(cond, then_branch, else_branch),
            NodeKind::Call(call) => self.eval_call(call),
            NodeKind::Matches { target, pattern } => self.eval_matches(target, pattern),
            NodeKind::Comprehension(c) => self.eval_comprehension(c),
        }
    }

    fn eval_select(&self, operand: &Node, field: &str) -> Result<Value, EvalError> {
        let value = self.eval_node(operand)?;
        select_field(&value, field)
    }

    fn eval_has(&self, operand: &Node, field: &str) -> Result<Value, EvalError> {
        let value = self.eval_node(operand)?;
        test_field(&value, field)
    }

    fn eval_index(&self, operand: &Node, index: &Node) -> Result<Value, EvalError> {
        let container = self.eval_node(operand)?;
        let index = self.eval_node(index)?;
        access_index(&container, &index)
    }

    fn eval_unary_expr(&self, op: UnaryOp, operand: &Node) -> Result<Value, EvalError> {
        let value = self.eval_node(operand)?;
        eval_unary(op, value)
    }

    fn eval_binary_expr(&self, op: BinaryOp, left: &Node, right: &Node) -> Result<Value, EvalError> {
        let left = self.eval_node(left)?;
        let right = self.eval_node(right)?;
        eval_binary(op, left, right)
    }

    fn eval_ident(&self, name: &str) -> Result<Value, EvalError> {
        if self.activation.is_unknown(name) {
            return Ok(Value::unknown(name));
        }
        self.activation
            .resolve(name)
            .ok_or_else(|| EvalError::unknown_identifier(name))
    }

    fn eval_local(&self, name: &str, depth: usize) -> Result<Value, EvalError> {
        let mut frame = self.locals;
        for _ in 0..depth {
            frame = frame.and_then(|f| f.parent);
        }
        frame
            .map(|f| f.value.clone())
            .ok_or_else(|| EvalError::internal(format!("unbound comprehension variable '{}'", name)))
    }

    fn eval_list(&self, items: &[Node]) -> Result<Value, EvalError> {
        let values = items
            .iter()
            .map(|item| self.eval_node(item))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(unknown) = merge_unknowns(&values) {
            return Ok(unknown);
        }
        Ok(Value::list(values))
    }

    fn eval_map(&self, entries: &[(Node, Node)]) -> Result<Value, EvalError> {
        let mut evaluated = Vec::with_capacity(entries.len());
        for (key_node, value_node) in entries {
            let key = self.eval_node(key_node)?;
            let value = self.eval_node(value_node)?;
            evaluated.push((key, value));
        }
        if let Some(unknown) = merge_unknowns(evaluated.iter().flat_map(|(k, v)| [k, v])) {
            return Ok(unknown);
        }

        let mut map = ValueMap::new();
        for ((key, value), (key_node, _)) in evaluated.into_iter().zip(entries) {
            let span = key_node.span.clone();
            let map_key = MapKey::from_value(&key).ok_or_else(|| {
                EvalError::invalid_argument(format!("unsupported map key type: {}", key.type_name()))
                    .with_span(span.clone())
            })?;
            if map.contains_value(&key) {
                return Err(
                    EvalError::invalid_argument(format!("duplicate map key: {}", key))
                        .with_span(span),
                );
            }
            map.insert(map_key, value);
        }
        Ok(map.into())
    }

    fn eval_struct(&self, type_name: &Arc<str>, fields: &[(Arc<str>, Node)]) -> Result<Value, EvalError> {
        let mut values = Vec::with_capacity(fields.len());
        for (name, node) in fields {
            values.push((name.clone(), self.eval_node(node)?));
        }
        if let Some(unknown) = merge_unknowns(values.iter().map(|(_, v)| v)) {
            return Ok(unknown);
        }
        Ok(StructValue::new(type_name.clone(), values).into())
    }

    /// `&&` when `short_circuit` is false, `||` when it is true.
    ///
    /// A side equal to `short_circuit` decides the result even if the other
    /// side fails. Otherwise unknowns win over errors, and errors over
    /// non-boolean operands.
    fn eval_logical(&self, left: &Node, right: &Node, short_circuit: bool) -> Result<Value, EvalError> {
        let op = if short_circuit { "_||_" } else { "_&&_" };

        let left = self.eval_node(left);
        if matches!(left, Ok(Value::Bool(b)) if b == short_circuit) {
            return Ok(Value::Bool(short_circuit));
        }
        let right = self.eval_node(right);
        if matches!(right, Ok(Value::Bool(b)) if b == short_circuit) {
            return Ok(Value::Bool(short_circuit));
        }

        if let (Ok(l), Ok(r)) = (&left, &right) {
            if let Some(unknown) = merge_unknowns([l, r]) {
                return Ok(unknown);
            }
        }
        for side in [&left, &right] {
            if let Ok(unknown @ Value::Unknown(_)) = side {
                return Ok(unknown.clone());
            }
        }
        let (left, right) = (left?, right?);
        match (&left, &right) {
            (Value::Bool(_), Value::Bool(_)) => Ok(Value::Bool(!short_circuit)),
            _ => Err(EvalError::no_matching_overload(op, &[&left, &right])),
        }
    }

    fn eval_conditional(&self, cond: &Node, then_branch: &Node, else_branch: &Node) -> Result<Value, EvalError> {
        match self.eval_node(cond)? {
            Value::Bool(true) => self.eval_node(then_branch),
            Value::Bool(false) => self.eval_node(else_branch),
            unknown @ Value::Unknown(_) => Ok(unknown),
            other => Err(EvalError::no_matching_overload("_?_:_", &[&other])),
        }
    }

    fn eval_call(&self, call: &Call) -> Result<Value, EvalError> {
        let builtin = match &call.function {
            Function::Builtin(builtin) => *builtin,
            Function::Unknown(name) => return Err(EvalError::unknown_function(name)),
        };
        let args = call
            .args
            .iter()
            .map(|arg| self.eval_node(arg))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(unknown) = merge_unknowns(&args) {
            return Ok(unknown);
        }
        functions::call(builtin, &args)
    }

    fn eval_matches(&self, target: &Node, pattern: &Pattern) -> Result<Value, EvalError> {
        let target = self.eval_node(target)?;
        let dynamic;
        let regex = match pattern {
            Pattern::Compiled(regex) => regex,
            Pattern::Dynamic(node) => {
                let pattern = self.eval_node(node)?;
                if let Some(unknown) = merge_unknowns([&target, &pattern]) {
                    return Ok(unknown);
                }
                let source = pattern.as_str().ok_or_else(|| {
                    EvalError::no_matching_overload("matches", &[&target, &pattern])
                })?;
                dynamic = Regex::new(source).map_err(|e| {
                    EvalError::invalid_argument(format!(
                        "invalid regular expression '{}': {}",
                        source, e
                    ))
                })?;
                &dynamic
            }
        };
        match &target {
            Value::String(s) => Ok(Value::Bool(regex.is_match(s))),
            unknown @ Value::Unknown(_) => Ok(unknown.clone()),
            other => Err(EvalError::no_matching_overload("matches", &[other])),
        }
    }

    // ==================== Comprehensions ====================

    /// Evaluate `body` with the comprehension's variables bound.
    fn with_bindings(
        &self,
        c: &Comprehension,
        index: Value,
        value: Value,
        body: &Node,
    ) -> Result<Value, EvalError> {
        match c.index_var {
            Some(_) => {
                let index_frame = Frame {
                    value: index,
                    parent: self.locals,
                };
                let value_frame = Frame {
                    value,
                    parent: Some(&index_frame),
                };
                self.scoped(&value_frame).eval_node(body)
            }
            None => {
                let frame = Frame {
                    value,
                    parent: self.locals,
                };
                self.scoped(&frame).eval_node(body)
            }
        }
    }

    fn scoped<'b>(&'b self, frame: &'b Frame<'b>) -> Evaluator<'b> {
        Evaluator {
            activation: self.activation,
            locals: Some(frame),
        }
    }

    fn eval_comprehension(&self, c: &Comprehension) -> Result<Value, EvalError> {
        let range = self.eval_node(&c.range)?;
        let elements: Box<dyn Iterator<Item = (Value, Value)> + '_> = match &range {
            Value::List(items) => Box::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Value::Int(i as i64), v.clone())),
            ),
            Value::Map(map) if c.index_var.is_some() => {
                Box::new(map.iter().map(|(k, v)| (k.to_value(), v.clone())))
            }
            // A single variable over a map ranges over its keys.
            Value::Map(map) => Box::new(map.keys().map(|k| (Value::Null, k.to_value()))),
            Value::Unknown(_) => return Ok(range.clone()),
            other => {
                return Err(EvalError::no_matching_overload(
                    "comprehension range",
                    &[other],
                ))
            }
        };

        match &c.kind {
            ComprehensionKind::All(predicate) => self.fold_logical(c, elements, predicate, false),
            ComprehensionKind::Exists(predicate) => self.fold_logical(c, elements, predicate, true),
            ComprehensionKind::ExistsOne(predicate) => {
                let mut count = 0usize;
                for (index, value) in elements {
                    match self.with_bindings(c, index, value, predicate)? {
                        Value::Bool(true) => count += 1,
                        Value::Bool(false) => {}
                        unknown @ Value::Unknown(_) => return Ok(unknown),
                        other => return Err(EvalError::type_mismatch("bool", &other)),
                    }
                }
                Ok(Value::Bool(count == 1))
            }
            ComprehensionKind::Map { filter, transform } => {
                let mut results = Vec::new();
                for (index, value) in elements {
                    if let Some(filter) = filter {
                        match self.with_bindings(c, index.clone(), value.clone(), filter)? {
                            Value::Bool(true) => {}
                            Value::Bool(false) => continue,
                            unknown @ Value::Unknown(_) => return Ok(unknown),
                            other => return Err(EvalError::type_mismatch("bool", &other)),
                        }
                    }
                    results.push(self.with_bindings(c, index, value, transform)?);
                }
                if let Some(unknown) = merge_unknowns(&results) {
                    return Ok(unknown);
                }
                Ok(Value::list(results))
            }
            ComprehensionKind::Filter(predicate) => {
                let mut kept = Vec::new();
                for (index, value) in elements {
                    match self.with_bindings(c, index, value.clone(), predicate)? {
                        Value::Bool(true) => kept.push(value),
                        Value::Bool(false) => {}
                        unknown @ Value::Unknown(_) => return Ok(unknown),
                        other => return Err(EvalError::type_mismatch("bool", &other)),
                    }
                }
                Ok(Value::list(kept))
            }
        }
    }

    /// `all` and `exists` as chains of `&&` and `||`: stop at the first
    /// element equal to `short_circuit`, and only report an error when no
    /// element decided the result.
    fn fold_logical(
        &self,
        c: &Comprehension,
        elements: impl Iterator<Item = (Value, Value)>,
        predicate: &Node,
        short_circuit: bool,
    ) -> Result<Value, EvalError> {
        let mut unknown: Option<UnknownSet> = None;
        let mut first_error: Option<EvalError> = None;

        for (index, value) in elements {
            match self.with_bindings(c, index, value, predicate) {
                Ok(Value::Bool(b)) if b == short_circuit => return Ok(Value::Bool(short_circuit)),
                Ok(Value::Bool(_)) => {}
                Ok(Value::Unknown(u)) => unknown.get_or_insert_with(UnknownSet::default).merge(&u),
                Ok(other) => {
                    first_error.get_or_insert_with(|| EvalError::type_mismatch("bool", &other));
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(u) = unknown {
            return Ok(Value::Unknown(Arc::new(u)));
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(Value::Bool(!short_circuit)),
        }
    }
}

fn constant_value(c: &Constant) -> Value {
    match c {
        Constant::Null => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::UInt(u) => Value::UInt(*u),
        Constant::Double(d) => Value::Double(*d),
        Constant::String(s) => Value::String(s.clone()),
        Constant::Bytes(b) => Value::Bytes(b.clone()),
    }
}

// ==================== Field and Index Access ====================

fn select_field(value: &Value, field: &str) -> Result<Value, EvalError> {
    match value {
        Value::Map(map) => map
            .get(&MapKey::from(field))
            .cloned()
            .ok_or_else(|| EvalError::key_not_found(&Value::from(field))),
        Value::Struct(s) => s
            .get(field)
            .cloned()
            .ok_or_else(|| EvalError::field_not_found(field)),
        Value::Unknown(_) => Ok(value.clone()),
        other => Err(EvalError::no_matching_overload(
            &format!("_.{}", field),
            &[other],
        )),
    }
}

fn test_field(value: &Value, field: &str) -> Result<Value, EvalError> {
    match value {
        Value::Map(map) => Ok(Value::Bool(map.contains_key(&MapKey::from(field)))),
        Value::Struct(s) => Ok(Value::Bool(s.has(field))),
        Value::Unknown(_) => Ok(value.clone()),
        other => Err(EvalError::no_matching_overload("has", &[other])),
    }
}

fn list_index(index: &Value) -> Option<Result<usize, ()>> {
    let position = match index {
        Value::Int(i) => usize::try_from(*i).map_err(|_| ()),
        Value::UInt(u) => usize::try_from(*u).map_err(|_| ()),
        Value::Double(d) if d.fract() == 0.0 => {
            if *d < 0.0 || !d.is_finite() {
                Err(())
            } else {
                Ok(*d as usize)
            }
        }
        _ => return None,
    };
    Some(position)
}

fn access_index(container: &Value, index: &Value) -> Result<Value, EvalError> {
    if let Some(unknown) = merge_unknowns([container, index]) {
        return Ok(unknown);
    }
    match container {
        Value::List(items) => {
            let position = list_index(index)
                .ok_or_else(|| EvalError::no_matching_overload("_[_]", &[container, index]))?;
            position
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| EvalError::index_out_of_bounds(index, items.len()))
        }
        Value::Map(map) => map
            .get_value(index)
            .cloned()
            .ok_or_else(|| EvalError::key_not_found(index)),
        _ => Err(EvalError::no_matching_overload("_[_]", &[container, index])),
    }
}

// ==================== Operators ====================

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    if value.is_unknown() {
        return Ok(value);
    }
    match (op, &value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer negation overflow")),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::Neg, Value::Duration(d)) => Duration::from_total_nanos(-d.total_nanos())
            .map(Value::Duration)
            .ok_or_else(|| EvalError::range("duration out of range")),
        (UnaryOp::Not, other) => Err(EvalError::no_matching_overload("!_", &[other])),
        (UnaryOp::Neg, other) => Err(EvalError::no_matching_overload("-_", &[other])),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if let Some(unknown) = merge_unknowns([&left, &right]) {
        return Ok(unknown);
    }
    match op {
        BinaryOp::Add => eval_add(&left, &right),
        BinaryOp::Sub => eval_sub(&left, &right),
        BinaryOp::Mul => eval_mul(&left, &right),
        BinaryOp::Div => eval_div(&left, &right),
        BinaryOp::Mod => eval_mod(&left, &right),
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => eval_ordering(op, &left, &right, Ordering::is_lt),
        BinaryOp::Le => eval_ordering(op, &left, &right, Ordering::is_le),
        BinaryOp::Gt => eval_ordering(op, &left, &right, Ordering::is_gt),
        BinaryOp::Ge => eval_ordering(op, &left, &right, Ordering::is_ge),
        BinaryOp::In => eval_in(&left, &right),
        BinaryOp::And | BinaryOp::Or => Err(EvalError::internal(format!(
            "logical operator '{}' reached strict evaluation",
            op
        ))),
    }
}

fn operator_name(op: BinaryOp) -> String {
    match op {
        BinaryOp::In => "@in".to_string(),
        op => format!("_{}_", op),
    }
}

/// Operands promoted to double when one side is a double and the other
/// any numeric kind.
fn promote(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let as_f64 = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    };
    match (left, right) {
        (Value::Double(_), _) | (_, Value::Double(_)) => Some((as_f64(left)?, as_f64(right)?)),
        _ => None,
    }
}

fn timestamp_result(total: i128) -> Result<Value, EvalError> {
    Timestamp::from_total_nanos(total)
        .map(Value::Timestamp)
        .ok_or_else(|| EvalError::range("timestamp out of range: must be between year 0001 and 9999"))
}

fn duration_result(total: i128) -> Result<Value, EvalError> {
    Duration::from_total_nanos(total)
        .map(Value::Duration)
        .ok_or_else(|| EvalError::range("duration out of range"))
}

fn eval_add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer addition overflow")),
        (Value::UInt(a), Value::UInt(b)) => a
            .checked_add(*b)
            .map(Value::UInt)
            .ok_or_else(|| EvalError::overflow("unsigned addition overflow")),
        (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
        (Value::Bytes(a), Value::Bytes(b)) => Ok(Value::bytes([&a[..], &b[..]].concat())),
        (Value::List(a), Value::List(b)) => Ok(Value::list(
            a.iter().chain(b.iter()).cloned().collect::<Vec<_>>(),
        )),
        (Value::Timestamp(t), Value::Duration(d)) | (Value::Duration(d), Value::Timestamp(t)) => {
            timestamp_result(t.total_nanos() + d.total_nanos())
        }
        (Value::Duration(a), Value::Duration(b)) => duration_result(a.total_nanos() + b.total_nanos()),
        _ => match promote(left, right) {
            Some((a, b)) => Ok(Value::Double(a + b)),
            None => Err(EvalError::no_matching_overload("_+_", &[left, right])),
        },
    }
}

fn eval_sub(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer subtraction overflow")),
        (Value::UInt(a), Value::UInt(b)) => a
            .checked_sub(*b)
            .map(Value::UInt)
            .ok_or_else(|| EvalError::overflow("unsigned subtraction overflow")),
        (Value::Timestamp(a), Value::Timestamp(b)) => duration_result(a.total_nanos() - b.total_nanos()),
        (Value::Timestamp(t), Value::Duration(d)) => timestamp_result(t.total_nanos() - d.total_nanos()),
        (Value::Duration(a), Value::Duration(b)) => duration_result(a.total_nanos() - b.total_nanos()),
        _ => match promote(left, right) {
            Some((a, b)) => Ok(Value::Double(a - b)),
            None => Err(EvalError::no_matching_overload("_-_", &[left, right])),
        },
    }
}

fn eval_mul(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer multiplication overflow")),
        (Value::UInt(a), Value::UInt(b)) => a
            .checked_mul(*b)
            .map(Value::UInt)
            .ok_or_else(|| EvalError::overflow("unsigned multiplication overflow")),
        _ => match promote(left, right) {
            Some((a, b)) => Ok(Value::Double(a * b)),
            None => Err(EvalError::no_matching_overload("_*_", &[left, right])),
        },
    }
}

fn eval_div(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
            Err(EvalError::division_by_zero())
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer division overflow")),
        (Value::UInt(a), Value::UInt(b)) => Ok(Value::UInt(a / b)),
        _ => match promote(left, right) {
            Some((a, b)) => Ok(Value::Double(a / b)),
            None => Err(EvalError::no_matching_overload("_/_", &[left, right])),
        },
    }
}

fn eval_mod(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
            Err(EvalError::modulo_by_zero())
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer modulo overflow")),
        (Value::UInt(a), Value::UInt(b)) => Ok(Value::UInt(a % b)),
        _ => Err(EvalError::no_matching_overload("_%_", &[left, right])),
    }
}

fn eval_ordering(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    test: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    if left.is_numeric() && right.is_numeric() {
        // NaN is unordered: every comparison with it is false.
        return Ok(Value::Bool(compare_numeric(left, right).is_some_and(test)));
    }
    match left.compare(right) {
        Some(ord) => Ok(Value::Bool(test(ord))),
        None => Err(EvalError::no_matching_overload(
            &operator_name(op),
            &[left, right],
        )),
    }
}

fn eval_in(element: &Value, container: &Value) -> Result<Value, EvalError> {
    match container {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item == element))),
        Value::Map(map) => Ok(Value::Bool(map.contains_value(element))),
        _ => Err(EvalError::no_matching_overload("@in", &[element, container])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Context, EvalErrorKind};

    fn eval_with(source: &str, activation: &dyn Activation) -> Result<Value, EvalError> {
        let ast = cel_engine_parser::parse(source).expect("parse failed");
        let node = cel_engine_checker::check(&ast).expect("check failed");
        Evaluator::new(activation).eval(&node)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_with(source, &Context::new())
    }

    fn eval_ok(source: &str) -> Value {
        eval(source).unwrap_or_else(|e| panic!("'{}' failed: {}", source, e))
    }

    fn eval_err(source: &str) -> EvalError {
        match eval(source) {
            Ok(v) => panic!("'{}' should fail, got {}", source, v),
            Err(e) => e,
        }
    }

    #[test]
    fn literals() {
        assert_eq!(eval_ok("null"), Value::Null);
        assert_eq!(eval_ok("true"), Value::Bool(true));
        assert_eq!(eval_ok("42"), Value::Int(42));
        assert!(matches!(eval_ok("42u"), Value::UInt(42)));
        assert!(matches!(eval_ok("2.5"), Value::Double(d) if d == 2.5));
        assert_eq!(eval_ok("'hi'"), Value::from("hi"));
        assert_eq!(eval_ok("b'hi'"), Value::bytes(b"hi".to_vec()));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval_ok("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval_ok("7 / 2"), Value::Int(3));
        assert_eq!(eval_ok("-7 % 3"), Value::Int(-1));
        assert_eq!(eval_ok("10u - 3u"), Value::UInt(7));
        assert_eq!(eval_ok("2.0 * 3"), Value::Double(6.0));
        assert_eq!(eval_ok("1 / 2.0"), Value::Double(0.5));
        assert_eq!(eval_ok("'ab' + 'cd'"), Value::from("abcd"));
        assert_eq!(eval_ok("[1] + [2]"), eval_ok("[1, 2]"));
    }

    #[test]
    fn mixed_int_uint_has_no_overload() {
        assert_eq!(eval_err("1 + 1u").kind, EvalErrorKind::NoMatchingOverload);
        assert_eq!(eval_err("1.5 % 1.0").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval_err("1 / 0").kind, EvalErrorKind::DivisionByZero);
        assert_eq!(eval_err("1u % 0u").message, "modulo by zero");
        assert_eq!(eval_ok("1.0 / 0.0"), Value::Double(f64::INFINITY));
    }

    #[test]
    fn overflow() {
        assert_eq!(eval_err("9223372036854775807 + 1").kind, EvalErrorKind::Overflow);
        assert_eq!(eval_err("0u - 1u").kind, EvalErrorKind::Overflow);
        assert_eq!(eval_err("-(-9223372036854775807 - 1)").kind, EvalErrorKind::Overflow);
        assert_eq!(eval_err("(-9223372036854775807 - 1) / -1").kind, EvalErrorKind::Overflow);
        assert_eq!(eval_ok("-9223372036854775807 - 1"), Value::Int(i64::MIN));
    }

    #[test]
    fn comparison() {
        assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
        assert_eq!(eval_ok("2u >= 2"), Value::Bool(true));
        assert_eq!(eval_ok("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval_ok("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval_ok("1 == 'a'"), Value::Bool(false));
        assert_eq!(eval_ok("null != 0"), Value::Bool(true));
        assert_eq!(eval_err("1 < 'a'").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn logical_operators_are_commutative_over_errors() {
        assert_eq!(eval_ok("false && undefined_var"), Value::Bool(false));
        assert_eq!(eval_ok("undefined_var && false"), Value::Bool(false));
        assert_eq!(eval_ok("true || 1 / 0 == 1"), Value::Bool(true));
        assert_eq!(eval_ok("1 / 0 == 1 || true"), Value::Bool(true));
        assert_eq!(eval_ok("1 && false"), Value::Bool(false));
        assert_eq!(eval_err("undefined_var && true").kind, EvalErrorKind::UnknownIdentifier);
        assert_eq!(eval_err("true && 1").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn ternary_evaluates_one_branch() {
        assert_eq!(eval_ok("true ? 1 : 1 / 0"), Value::Int(1));
        assert_eq!(eval_ok("false ? 1 / 0 : 2"), Value::Int(2));
        assert_eq!(eval_err("1 ? 2 : 3").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn field_and_index_access() {
        assert_eq!(eval_ok("{'a': {'b': 1}}.a.b"), Value::Int(1));
        assert_eq!(eval_ok("[10, 20][1]"), Value::Int(20));
        assert_eq!(eval_ok("{1: 'x'}[1u]"), Value::from("x"));
        assert_eq!(eval_ok("{1: 'x'}[1.0]"), Value::from("x"));
        assert_eq!(eval_err("{'a': 1}.b").kind, EvalErrorKind::KeyNotFound);
        assert_eq!(eval_err("[1][1]").kind, EvalErrorKind::IndexOutOfBounds);
        assert_eq!(eval_err("[1][-1]").kind, EvalErrorKind::IndexOutOfBounds);
        assert_eq!(eval_err("1.a").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn has_tests_presence() {
        assert_eq!(eval_ok("has({'a': 1}.a)"), Value::Bool(true));
        assert_eq!(eval_ok("has({'a': 1}.b)"), Value::Bool(false));
        assert_eq!(eval_ok("has(Point{x: 1}.x)"), Value::Bool(true));
        assert_eq!(eval_ok("has(Point{x: 1}.y)"), Value::Bool(false));
        assert_eq!(eval_err("has('s'.a)").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn membership() {
        assert_eq!(eval_ok("2 in [1, 2, 3]"), Value::Bool(true));
        assert_eq!(eval_ok("2u in [1, 2, 3]"), Value::Bool(true));
        assert_eq!(eval_ok("'k' in {'k': 1}"), Value::Bool(true));
        assert_eq!(eval_ok("'z' in {'k': 1}"), Value::Bool(false));
        assert_eq!(eval_err("1 in 'abc'").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn map_literal_keys() {
        assert_eq!(eval_err("{1.5: 'x'}").kind, EvalErrorKind::InvalidArgument);
        let err = eval_err("{1: 'a', 1u: 'b'}");
        assert_eq!(err.message, "duplicate map key: 1u");
        assert_eq!(err.span, Some(9..11));
    }

    #[test]
    fn comprehensions() {
        assert_eq!(eval_ok("[1, 2, 3].all(x, x > 0)"), Value::Bool(true));
        assert_eq!(eval_ok("[1, 2, 3].exists(x, x > 2)"), Value::Bool(true));
        assert_eq!(eval_ok("[1, 2, 3].exists_one(x, x > 1)"), Value::Bool(false));
        assert_eq!(eval_ok("[1, 2, 3].map(x, x * 2)"), eval_ok("[2, 4, 6]"));
        assert_eq!(eval_ok("[1, 2, 3].map(x, x > 1, x * 10)"), eval_ok("[20, 30]"));
        assert_eq!(eval_ok("[1, 2, 3].filter(x, x != 2)"), eval_ok("[1, 3]"));
        assert_eq!(eval_ok("{'a': 1, 'b': 2}.map(k, k)"), eval_ok("['a', 'b']"));
        assert_eq!(eval_ok("{'a': 1, 'b': 2}.exists(k, v, v == 2 && k == 'b')"), Value::Bool(true));
        assert_eq!(eval_ok("[5, 6].all(i, v, v == i + 5)"), Value::Bool(true));
    }

    #[test]
    fn comprehension_errors_only_surface_when_undecided() {
        assert_eq!(eval_ok("[0, 1].exists(x, 1 / x == 1)"), Value::Bool(true));
        assert_eq!(eval_ok("[0, 1].all(x, 1 / x == 5)"), Value::Bool(false));
        assert_eq!(eval_err("[0, 1].all(x, 1 / x == 1)").kind, EvalErrorKind::DivisionByZero);
        assert_eq!(eval_err("[0, 1].exists_one(x, 1 / x == 1)").kind, EvalErrorKind::DivisionByZero);
    }

    #[test]
    fn comprehensions_walk_ranges_in_order() {
        assert_eq!(eval_ok("{'b': 0, 'a': 1}.exists(k, v, 1 / v == 1)"), Value::Bool(true));
        assert_eq!(eval_ok("{'b': 2, 'a': 1}.all(k, v, v > 0 && k != 'c')"), Value::Bool(true));
        assert_eq!(eval_ok("['x', 'y', 'z'].exists_one(i, v, i == 1 && v == 'y')"), Value::Bool(true));
        assert_eq!(eval_ok("{'b': 2, 'a': 1}.filter(k, k != 'b')"), eval_ok("['a']"));
        assert_eq!(eval_ok("[].exists(x, x)"), Value::Bool(false));
        assert_eq!(eval_err("'s'.all(x, true)").kind, EvalErrorKind::NoMatchingOverload);
    }

    #[test]
    fn nested_comprehension_shadowing() {
        assert_eq!(
            eval_ok("[[1, 2], [3]].map(x, x.map(x, x * 10))"),
            eval_ok("[[10, 20], [30]]")
        );
        assert_eq!(
            eval_ok("[1, 2].all(x, [3, 4].exists(y, y > x))"),
            Value::Bool(true)
        );
    }

    #[test]
    fn unknowns_propagate() {
        let mut context = Context::new();
        context.declare_unknown("u");
        context.insert("n", 1);

        let run = |source: &str| eval_with(source, &context).unwrap();
        assert_eq!(run("u + n"), Value::unknown("u"));
        assert_eq!(run("u.field[0]"), Value::unknown("u"));
        assert_eq!(run("false && u"), Value::Bool(false));
        assert_eq!(run("u || true"), Value::Bool(true));
        assert_eq!(run("u && true"), Value::unknown("u"));
        assert_eq!(run("u ? 1 : 2"), Value::unknown("u"));
        assert_eq!(run("size(u)"), Value::unknown("u"));
    }

    #[test]
    fn error_span_points_at_failing_node() {
        let err = eval_err("1 + (2 / 0)");
        assert_eq!(err.span, Some(5..10));
    }

    #[test]
    fn unknown_function_fails_at_runtime() {
        let err = eval_err("frobnicate(1 / 0)");
        assert_eq!(err.kind, EvalErrorKind::UnknownFunction);
        assert_eq!(err.message, "unknown function: frobnicate");
    }

    #[test]
    fn dynamic_regex() {
        let context = Context::new().with_variable("re", "^a+$");
        assert_eq!(eval_with("'aaa'.matches(re)", &context), Ok(Value::Bool(true)));
        let bad = Context::new().with_variable("re", "(");
        assert_eq!(
            eval_with("'aaa'.matches(re)", &bad).unwrap_err().kind,
            EvalErrorKind::InvalidArgument
        );
    }
}

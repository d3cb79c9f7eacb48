//! Path and expression evaluation against a context graph.
//!
//! Paths walk the context left to right and select a subtree; a path
//! that selects nothing yields [`Value::Null`] rather than an error.
//! Expressions arrive from the parser as a flat operand/operator list and
//! are evaluated by precedence climbing: unary operators bind tightest,
//! then `* / %`, `+ -`, the ordering comparisons, `== !=`, `&`, `|` and
//! finally `=` (assignment, right-associative).

use crate::error::EvalError;
use crate::function;
use crate::graph::{
    Graph, Payload, TYPE_EXPRESSION, TYPE_GROUP, TYPE_INDEX, TYPE_PATH, TYPE_SELECTOR,
};

/// Result of evaluating a path or expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// A selected subtree (the matched node, cloned out of the context).
    Graph(Graph),
}

impl Value {
    /// Truthiness: null, false, zero and empty content are false. A
    /// graph's truth is decided by its first child's payload, so that
    /// `x 0` tests false while `x 1` tests true.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => scalar_truth(s),
            Value::Bytes(b) => !b.is_empty(),
            Value::Graph(g) => match g.children.first() {
                Some(first) => scalar_truth(&first.payload.to_text()),
                None => false,
            },
        }
    }

    /// Rendering form: a graph renders as the canonical text of its
    /// children, everything else as its scalar form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Graph(g) => g.text(),
        }
    }

    /// Scalar coercion used for comparisons and argument passing: a
    /// selected node contributes its first child's payload.
    pub fn scalar_text(&self) -> String {
        match self {
            Value::Graph(g) => g
                .children
                .first()
                .map(|c| c.payload.to_text())
                .unwrap_or_default(),
            other => other.to_text(),
        }
    }

    fn into_payload(self) -> Payload {
        match self {
            Value::Null => Payload::Nil,
            Value::Bool(b) => Payload::Bool(b),
            Value::Int(i) => Payload::Int(i),
            Value::Float(f) => Payload::Float(f),
            Value::Str(s) => Payload::Str(s),
            Value::Bytes(b) => Payload::Bytes(b),
            Value::Graph(g) => return g.payload,
        }
    }

    /// Wrap the value as a standalone subtree for assignment.
    pub(crate) fn into_graph(self) -> Graph {
        match self {
            Value::Graph(g) => g,
            other => Graph::new(other.into_payload()),
        }
    }
}

fn scalar_truth(s: &str) -> bool {
    if s.is_empty() || s == "false" {
        return false;
    }
    match parse_number(s) {
        Some(Value::Int(i)) => i != 0,
        Some(Value::Float(f)) => f != 0.0,
        _ => true,
    }
}

/// Parse a numeric literal: integer unless it contains `.`.
fn parse_number(s: &str) -> Option<Value> {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if s.contains('.') {
        s.parse::<f64>().ok().map(Value::Float)
    } else {
        s.parse::<i64>().ok().map(Value::Int)
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Evaluate a parsed path, expression or constant node against `ctx`.
pub fn eval(ctx: &mut Graph, node: &Graph) -> Result<Value, EvalError> {
    match node.payload.as_str() {
        Some(TYPE_PATH) => eval_path(ctx, node),
        Some(TYPE_EXPRESSION) | Some(TYPE_GROUP) => eval_items(ctx, &node.children),
        _ => Ok(constant(&node.payload)),
    }
}

impl Graph {
    /// Evaluate a parsed path or expression against this graph.
    pub fn eval(&mut self, node: &Graph) -> Result<Value, EvalError> {
        eval(self, node)
    }

    /// Parse and evaluate a path in one call.
    pub fn get_path(&mut self, path: &str) -> Result<Value, EvalError> {
        let p = Graph::parse_path(path)?;
        eval(self, &p)
    }

    /// Parse and evaluate an expression in one call.
    pub fn get_expression(&mut self, expr: &str) -> Result<Value, EvalError> {
        let e = Graph::parse_expression(expr)?;
        eval(self, &e)
    }
}

fn constant(p: &Payload) -> Value {
    match p {
        Payload::Nil => Value::Null,
        Payload::Str(s) => parse_number(s).unwrap_or_else(|| Value::Str(s.clone())),
        Payload::Bytes(b) => Value::Bytes(b.clone()),
        Payload::Int(i) => Value::Int(*i),
        Payload::Float(f) => Value::Float(*f),
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Typed(t) => Value::Str(t.clone()),
        Payload::Handle(_) => Value::Null,
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Follow an index path from the root.
pub(crate) fn node_at<'g>(root: &'g Graph, path: &[usize]) -> &'g Graph {
    let mut node = root;
    for &i in path {
        node = &node.children[i];
    }
    node
}

pub(crate) fn node_at_mut<'g>(root: &'g mut Graph, path: &[usize]) -> &'g mut Graph {
    match path.split_first() {
        Some((&i, rest)) => node_at_mut(&mut root.children[i], rest),
        None => root,
    }
}

fn eval_path(ctx: &mut Graph, path: &Graph) -> Result<Value, EvalError> {
    let mut cur: Vec<usize> = Vec::new();
    let elems = &path.children;

    let mut ix = 0;
    while ix < elems.len() {
        let elem = &elems[ix];
        match elem.payload.as_str() {
            Some(TYPE_INDEX) => {
                let v = eval_items(ctx, &elem.children)?;
                let Some(i) = as_index(&v) else {
                    return Ok(Value::Null);
                };
                if i >= node_at(ctx, &cur).children.len() {
                    return Ok(Value::Null);
                }
                cur.push(i);
            }
            Some(TYPE_SELECTOR) => {
                if elem.children.is_empty() {
                    return Ok(Value::Null);
                }
                // the selector expression sees the current subtree
                let mut scope = node_at(ctx, &cur).clone();
                let v = eval_items(&mut scope, &elem.children)?;
                let wanted = v.scalar_text();
                let found = node_at(ctx, &cur)
                    .children
                    .iter()
                    .position(|c| c.payload.text_eq(&wanted));
                match found {
                    Some(i) => cur.push(i),
                    None => return Ok(Value::Null),
                }
            }
            Some(TYPE_GROUP) => {
                // bound functions never reach here (the token arm
                // dispatches them); the group is a tuple to select by:
                // the first child whose own children carry the same
                // value sequence
                if elem.children.is_empty() {
                    return Ok(Value::Null);
                }
                let mut wanted = Vec::with_capacity(elem.children.len());
                for a in &elem.children {
                    wanted.push(eval(ctx, a)?.scalar_text());
                }
                let found = node_at(ctx, &cur).children.iter().position(|c| {
                    c.children.len() == wanted.len()
                        && c.children
                            .iter()
                            .zip(&wanted)
                            .all(|(v, w)| v.payload.text_eq(w))
                });
                match found {
                    Some(i) => cur.push(i),
                    None => return Ok(Value::Null),
                }
            }
            _ => {
                let name = elem.payload.to_text();
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
                    let i: usize = name.parse().map_err(|_| {
                        EvalError::TypeMismatch("index out of range")
                    })?;
                    if i >= node_at(ctx, &cur).children.len() {
                        return Ok(Value::Null);
                    }
                    cur.push(i);
                } else {
                    let found = node_at(ctx, &cur)
                        .children
                        .iter()
                        .position(|c| c.payload.text_eq(&name));
                    match found {
                        Some(i) => cur.push(i),
                        None => return Ok(Value::Null),
                    }
                    // a node bound through `!type` turns the rest of the
                    // path into a function or method invocation
                    if node_at(ctx, &cur).node("!type").is_some() {
                        return function::call(ctx, &cur, path, ix + 1);
                    }
                }
            }
        }
        ix += 1;
    }

    Ok(Value::Graph(node_at(ctx, &cur).clone()))
}

fn as_index(v: &Value) -> Option<usize> {
    match as_number(v)? {
        Num::I(i) if i >= 0 => Some(i as usize),
        _ => None,
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "=" => 1,
        "|" => 2,
        "&" => 3,
        "==" | "!=" => 4,
        "<" | ">" | "<=" | ">=" => 5,
        "+" | "-" => 6,
        "*" | "/" | "%" => 7,
        _ => return None,
    })
}

/// Evaluate a flat operand/operator list.
pub(crate) fn eval_items(ctx: &mut Graph, items: &[Graph]) -> Result<Value, EvalError> {
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let mut pos = 0;
    eval_binary(ctx, items, &mut pos, 0)
}

fn eval_binary(
    ctx: &mut Graph,
    items: &[Graph],
    pos: &mut usize,
    min_prec: u8,
) -> Result<Value, EvalError> {
    let lhs_ix = *pos;
    let mut lhs = eval_unary(ctx, items, pos)?;

    loop {
        let Some(op) = items.get(*pos).and_then(|n| n.payload.as_str()) else {
            return Ok(lhs);
        };
        let Some(prec) = precedence(op) else {
            return Ok(lhs);
        };
        if prec < min_prec {
            return Ok(lhs);
        }
        let op = op.to_string();
        *pos += 1;

        if op == "=" {
            // right-associative; the left side must be a bare path
            let rhs = eval_binary(ctx, items, pos, prec)?;
            let target = &items[lhs_ix];
            if target.payload.as_str() != Some(TYPE_PATH) {
                return Err(EvalError::BadAssignment);
            }
            assign(ctx, target, rhs.clone().into_graph())?;
            lhs = rhs;
            continue;
        }

        let rhs = eval_binary(ctx, items, pos, prec + 1)?;
        lhs = apply_binary(&op, lhs, rhs)?;
    }
}

fn eval_unary(ctx: &mut Graph, items: &[Graph], pos: &mut usize) -> Result<Value, EvalError> {
    let Some(item) = items.get(*pos) else {
        return Ok(Value::Null);
    };
    *pos += 1;

    if let Some(s) = item.payload.as_str() {
        match s {
            TYPE_PATH => return eval_path(ctx, item),
            TYPE_GROUP | TYPE_EXPRESSION => return eval_items(ctx, &item.children),
            "!" => {
                let v = eval_unary(ctx, items, pos)?;
                return Ok(Value::Bool(!v.is_true()));
            }
            "-" => {
                let v = eval_unary(ctx, items, pos)?;
                return match as_number(&v) {
                    Some(Num::I(i)) => Ok(Value::Int(-i)),
                    Some(Num::F(f)) => Ok(Value::Float(-f)),
                    None => Err(EvalError::TypeMismatch("cannot negate a non-number")),
                };
            }
            _ if !s.is_empty() && s.chars().all(crate::chars::is_operator_char) => {
                return Err(EvalError::TypeMismatch("unsupported unary operator"));
            }
            _ => {}
        }
    }
    Ok(constant(&item.payload))
}

enum Num {
    I(i64),
    F(f64),
}

fn as_number(v: &Value) -> Option<Num> {
    match v {
        Value::Int(i) => Some(Num::I(*i)),
        Value::Float(f) => Some(Num::F(*f)),
        Value::Str(s) => match parse_number(s)? {
            Value::Int(i) => Some(Num::I(i)),
            Value::Float(f) => Some(Num::F(f)),
            _ => None,
        },
        Value::Graph(_) => match parse_number(&v.scalar_text())? {
            Value::Int(i) => Some(Num::I(i)),
            Value::Float(f) => Some(Num::F(f)),
            _ => None,
        },
        _ => None,
    }
}

fn apply_binary(op: &str, a: Value, b: Value) -> Result<Value, EvalError> {
    match op {
        "+" | "-" | "*" | "/" | "%" => arithmetic(op, &a, &b),
        "<" | ">" | "<=" | ">=" => ordering(op, &a, &b),
        "==" => Ok(Value::Bool(loose_eq(&a, &b))),
        "!=" => Ok(Value::Bool(!loose_eq(&a, &b))),
        "&" => Ok(Value::Bool(a.is_true() && b.is_true())),
        "|" => Ok(Value::Bool(a.is_true() || b.is_true())),
        _ => Err(EvalError::TypeMismatch("unknown operator")),
    }
}

fn arithmetic(op: &str, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let (Some(x), Some(y)) = (as_number(a), as_number(b)) else {
        return Err(EvalError::TypeMismatch("arithmetic on a non-number"));
    };
    match (x, y) {
        (Num::I(x), Num::I(y)) => {
            let v = match op {
                "+" => x.wrapping_add(y),
                "-" => x.wrapping_sub(y),
                "*" => x.wrapping_mul(y),
                "/" => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    x.wrapping_div(y)
                }
                _ => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    x.wrapping_rem(y)
                }
            };
            Ok(Value::Int(v))
        }
        (x, y) => {
            let (x, y) = (to_f64(x), to_f64(y));
            let v = match op {
                "+" => x + y,
                "-" => x - y,
                "*" => x * y,
                "/" => x / y,
                _ => x % y,
            };
            Ok(Value::Float(v))
        }
    }
}

fn to_f64(n: Num) -> f64 {
    match n {
        Num::I(i) => i as f64,
        Num::F(f) => f,
    }
}

fn ordering(op: &str, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let (Some(x), Some(y)) = (as_number(a), as_number(b)) else {
        return Err(EvalError::TypeMismatch("ordering on a non-number"));
    };
    let (x, y) = (to_f64(x), to_f64(y));
    let v = match op {
        "<" => x < y,
        ">" => x > y,
        "<=" => x <= y,
        _ => x >= y,
    };
    Ok(Value::Bool(v))
}

/// Equality across value kinds: numeric when both sides are numbers,
/// scalar text otherwise.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return to_f64(x) == to_f64(y);
    }
    a.scalar_text() == b.scalar_text()
}

/// The elements a loop can walk: the children of a selected subtree.
/// Any other value has nothing to iterate.
pub fn iterable(v: Value) -> Result<Vec<Graph>, EvalError> {
    match v {
        Value::Graph(g) => Ok(g.children),
        _ => Err(EvalError::NotIterable),
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// Assign a subtree at a path, creating missing nodes along the way. The
/// first child at the target is overwritten (or created).
pub fn assign(ctx: &mut Graph, path: &Graph, value: Graph) -> Result<(), EvalError> {
    let mut cur: Vec<usize> = Vec::new();
    for elem in &path.children {
        let name = match elem.payload.as_str() {
            Some(s) if !s.starts_with('!') => s.to_string(),
            _ => return Err(EvalError::BadAssignment),
        };
        let node = node_at_mut(ctx, &cur);
        let i = match node.children.iter().position(|c| c.payload.text_eq(&name)) {
            Some(i) => i,
            None => {
                node.add(name.as_str());
                node.children.len() - 1
            }
        };
        cur.push(i);
    }
    if cur.is_empty() {
        return Err(EvalError::BadAssignment);
    }
    let node = node_at_mut(ctx, &cur);
    if node.children.is_empty() {
        node.children.push(value);
    } else {
        node.children[0] = value;
    }
    Ok(())
}

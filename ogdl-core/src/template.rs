//! Text templates with `$` variables, conditionals and loops.
//!
//! A template is any text in which `$` switches from the literal plane to
//! the variable plane. Paths render their value; `$(...)` expressions are
//! evaluated silently, for their side effects:
//!
//! ```text
//! Hello $user.name.
//! $(seen = 1)
//! $if(n > 9) Busy day. $end
//! $for(m, messages) - $m
//! $end
//! ```
//!
//! Parsing produces a flat AST; `simplify` turns paths whose first
//! element is a keyword (`if`, `else`, `end`, `for`, `break`) into flow
//! nodes, and `flow` nests each block's body under it, strictly LIFO.
//! Processing walks the nested AST against a context graph and appends to
//! an output buffer. Evaluation failures never abort a render: the
//! directive contributes nothing and the failure is logged.

use tracing::warn;

use crate::error::{EvalError, SyntaxError};
use crate::eval;
use crate::graph::{
    Graph, TYPE_BREAK, TYPE_ELSE, TYPE_END, TYPE_EXPRESSION, TYPE_FOR, TYPE_IF, TYPE_PATH,
    TYPE_TEMPLATE,
};
use crate::parser::Parser;

/// Parse template text into its processed AST.
pub fn parse_template(text: &str) -> Result<Graph, SyntaxError> {
    let mut p = Parser::new(text);
    p.template()?;
    let mut t = p.into_graph(TYPE_TEMPLATE);
    simplify(&mut t);
    flow(&mut t);
    Ok(t)
}

impl Graph {
    /// Parse template text into its processed AST.
    pub fn parse_template(text: &str) -> Result<Graph, SyntaxError> {
        parse_template(text)
    }

    /// Render a parsed template against this graph.
    pub fn process(&mut self, template: &Graph) -> Vec<u8> {
        process(template, self)
    }
}

/// Render a parsed template against a context, returning the output
/// bytes.
pub fn process(template: &Graph, ctx: &mut Graph) -> Vec<u8> {
    let mut buf = Vec::new();
    process_into(template, ctx, &mut buf);
    buf
}

// ============================================================================
// AST post-processing
// ============================================================================

/// Rewrite `!p` nodes whose first element is a flow keyword.
fn simplify(t: &mut Graph) {
    for node in &mut t.children {
        if node.payload.as_str() != Some(TYPE_PATH) {
            continue;
        }
        let keyword = match node.children.first().and_then(|f| f.payload.as_str()) {
            Some("if") => TYPE_IF,
            Some("else") => TYPE_ELSE,
            Some("end") => TYPE_END,
            Some("for") => TYPE_FOR,
            Some("break") => TYPE_BREAK,
            _ => continue,
        };
        node.payload = keyword.into();
        node.children.remove(0);
    }
}

/// Nest `if`/`for` bodies. Each opener owns an inline template holding
/// the nodes up to its matching `end`; an `else` at nesting depth one
/// splits the block. Openers and closers pair strictly LIFO; a stray
/// `end` with no open block is dropped.
fn flow(t: &mut Graph) {
    let mut depth = 0usize;
    // where collected nodes go: the index of the open block node, and
    // whether it is an `else` (which owns its body directly)
    let mut owner: Option<(usize, bool)> = None;

    let mut i = 0;
    while i < t.children.len() {
        let tag = t.children[i].payload.as_str().unwrap_or("").to_string();

        if tag == TYPE_IF || tag == TYPE_FOR {
            depth += 1;
            if depth == 1 {
                t.children[i].children.push(Graph::new(TYPE_TEMPLATE));
                owner = Some((i, false));
                i += 1;
                continue;
            }
        } else if tag == TYPE_ELSE && depth == 1 {
            flow_owner(t, owner);
            owner = Some((i, true));
            i += 1;
            continue;
        } else if tag == TYPE_END {
            if depth == 0 {
                t.children.remove(i);
                continue;
            }
            depth -= 1;
            if depth == 0 {
                flow_owner(t, owner);
                owner = None;
                t.children.remove(i);
                continue;
            }
        }

        if depth > 0 {
            let node = t.children.remove(i);
            if let Some((o, is_else)) = owner {
                if is_else {
                    t.children[o].children.push(node);
                } else if let Some(body) = t.children[o].children.last_mut() {
                    body.children.push(node);
                }
            }
            continue;
        }
        i += 1;
    }

    // an unterminated block still gets its body nested
    if depth > 0 {
        flow_owner(t, owner);
    }
}

/// Recursively flow the body collected under an open block.
fn flow_owner(t: &mut Graph, owner: Option<(usize, bool)>) {
    let Some((o, is_else)) = owner else { return };
    if is_else {
        flow(&mut t.children[o]);
    } else if let Some(body) = t.children[o].children.last_mut() {
        flow(body);
    }
}

// ============================================================================
// Interpretation
// ============================================================================

/// Walk one template level. Returns true when a `break` was hit, so an
/// enclosing loop can stop.
fn process_into(t: &Graph, ctx: &mut Graph, buf: &mut Vec<u8>) -> bool {
    let mut false_if = false;

    for node in &t.children {
        match node.payload.as_str() {
            Some(TYPE_PATH) => match eval::eval(ctx, node) {
                Ok(v) => buf.extend_from_slice(v.to_text().as_bytes()),
                Err(e) => warn!(error = %e, "template path evaluation failed"),
            },
            Some(TYPE_EXPRESSION) => {
                // evaluated for its side effects only
                if let Err(e) = eval::eval(ctx, node) {
                    warn!(error = %e, "template expression evaluation failed");
                }
            }
            Some(TYPE_IF) => {
                let guard = node.get(0).and_then(|g| g.get(0));
                let taken = guard
                    .map(|e| eval::eval(ctx, e).map(|v| v.is_true()).unwrap_or(false))
                    .unwrap_or(false);
                if taken {
                    if let Some(body) = node.get(1) {
                        if process_into(body, ctx, buf) {
                            return true;
                        }
                    }
                    false_if = false;
                } else {
                    false_if = true;
                }
            }
            Some(TYPE_ELSE) => {
                if false_if {
                    if process_into(node, ctx, buf) {
                        return true;
                    }
                    false_if = false;
                }
            }
            Some(TYPE_FOR) => {
                let head = node.get(0);
                let dest = head.and_then(|g| g.get(0)).and_then(|e| e.get(0));
                let source = head.and_then(|g| g.get(1));
                let body = node.get(1);
                let (Some(dest), Some(source), Some(body)) = (dest, source, body) else {
                    continue;
                };
                let items = match eval::eval(ctx, source).and_then(eval::iterable) {
                    Ok(items) => items,
                    // a non-iterable source skips the loop without output
                    Err(EvalError::NotIterable) => continue,
                    Err(e) => {
                        warn!(error = %e, "loop source evaluation failed");
                        continue;
                    }
                };
                for item in items {
                    if let Err(e) = eval::assign(ctx, dest, item) {
                        warn!(error = %e, "loop assignment failed");
                        break;
                    }
                    if process_into(body, ctx, buf) {
                        break;
                    }
                }
            }
            Some(TYPE_BREAK) => return true,
            _ => node.payload.append_to(buf),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, ctx_text: &str) -> String {
        let t = parse_template(template).unwrap();
        let mut ctx = Graph::parse(ctx_text).unwrap();
        String::from_utf8(process(&t, &mut ctx)).unwrap()
    }

    #[test]
    fn literal_text_is_verbatim() {
        let input = "plain text, no substitutions (at all)\nsecond line";
        assert_eq!(render(input, "x 1"), input);
    }

    #[test]
    fn simplify_rewrites_keywords() {
        let t = parse_template("$if(x)$end").unwrap();
        assert_eq!(t.get(0).unwrap().string(), TYPE_IF);
    }

    #[test]
    fn flow_nests_bodies() {
        let t = parse_template("$if(x) yes $end after").unwrap();
        // [!if [!g, !t[" yes "]], " after"]
        assert_eq!(t.len(), 2);
        let body = t.get(0).unwrap().get(1).unwrap();
        assert_eq!(body.string(), TYPE_TEMPLATE);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn else_splits_the_block() {
        let t = parse_template("$if(x) a $else b $end").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1).unwrap().string(), TYPE_ELSE);
        assert_eq!(t.get(1).unwrap().len(), 1);
    }

    #[test]
    fn nested_blocks_pair_lifo() {
        let t = parse_template("$if(a)$if(b) x $end y $end z").unwrap();
        // the outer if owns one body; the inner if nests inside it
        assert_eq!(t.len(), 2);
        let outer_body = t.get(0).unwrap().get(1).unwrap();
        assert_eq!(outer_body.get(0).unwrap().string(), TYPE_IF);
    }

    #[test]
    fn stray_end_is_dropped() {
        let t = parse_template("a $end b").unwrap();
        assert_eq!(render("a $end b", "x 1"), "a  b");
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn dollar_escape() {
        assert_eq!(render(r"price: $\5", "x 1"), "price: $5");
    }

    #[test]
    fn path_renders_subtree_text() {
        assert_eq!(render("$a", "a 7"), "7");
    }

    #[test]
    fn expression_is_silent_but_effective() {
        assert_eq!(render("$(x = 3)$x", "x 1"), "3");
    }

    #[test]
    fn failed_directive_renders_empty() {
        assert_eq!(render("[$(name * 2)]", "name bob"), "[]");
    }
}

//! Recursive-descent productions for OGDL text, paths, expressions and
//! templates.
//!
//! The grammar, in outline:
//!
//! ```text
//! Graph    ::= Line* End
//! Line     ::= Space(n) Sequence? ((Comment? Break) | Block)?
//! Sequence ::= (Scalar|Group) (Space? ','? Space? (Scalar|Group))*
//! Group    ::= '(' WS? Sequence? WS? ')'
//! Scalar   ::= Quoted | String
//! Block    ::= '\' NL lines-with-greater-indent
//! Path     ::= Element ('.' Element)*
//! Element  ::= Token | Number | Quoted | Group | Index | Selector
//! Expr     ::= Unary (Op2 Unary)*
//! Unary    ::= Path | Number | Quoted | Op1 Unary | '(' Expr ')'
//! Template ::= (Text | Variable)*
//! Variable ::= '$' (Path | '(' Expr ')' | '{' Expr '}' | '\')
//! ```
//!
//! Indentation carries structure. The parser keeps a per-depth table of
//! the column each depth was last seen at; a new line maps to the
//! shallowest depth whose recorded column is at least the line's column,
//! or one past the deepest entry when none qualifies. The event sink
//! tolerates level gaps, so the table never needs repairing.
//!
//! Within a line, space descends one level per element and a comma
//! returns to the line's base depth. One group per line is allowed unless
//! commas separate them; a scalar directly after a detached group is a
//! syntax error, while after an attached group (`a(b,c) d`) the sequence
//! resumes at the base depth.

use crate::chars::{
    is_break_char, is_digit, is_end_char, is_letter, is_operator_char, is_template_text_char,
    is_text_char, is_token_char,
};
use crate::error::SyntaxError;
use crate::event::EventHandler;
use crate::graph::{
    Graph, Payload, TYPE_EXPRESSION, TYPE_GROUP, TYPE_INDEX, TYPE_PATH, TYPE_SELECTOR,
};
use crate::stream::CharStream;

/// Parser state for one parse call. Not reusable.
pub struct Parser<'a> {
    s: CharStream<'a>,
    ev: EventHandler,
    /// `ind[d]` is the column depth `d` was last seen at.
    ind: Vec<usize>,
    /// Indentation of the current line; quoted continuations un-indent by it.
    line_indent: usize,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Parser<'a> {
        Parser {
            s: CharStream::new(text),
            ev: EventHandler::new(),
            ind: Vec::new(),
            line_indent: 0,
        }
    }

    /// Parse a whole document.
    pub fn parse(mut self) -> Result<Graph, SyntaxError> {
        while self.line()? {}
        self.ev.set_level(0);
        Ok(self.ev.finish())
    }

    /// Finish a sub-production parse, labeling the root.
    pub(crate) fn into_graph(self, root: impl Into<Payload>) -> Graph {
        let mut g = self.ev.finish();
        g.payload = root.into();
        g
    }

    fn err(&self, message: &str) -> SyntaxError {
        SyntaxError {
            message: message.to_string(),
            line: self.s.line(),
            column: self.s.column(),
        }
    }

    /// Consume `c` if it is next.
    fn next_char_is(&mut self, c: char) -> bool {
        if self.s.read() == c {
            true
        } else {
            self.s.unread();
            false
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Space is `(0x20|0x09)+`. Returns whether space was found and how
    /// many characters, where a mixed tab/space run counts as zero.
    fn space(&mut self) -> (bool, usize) {
        // A block scalar may have read this line's indentation already.
        let owed = self.s.take_owed();
        if owed > 0 {
            return (true, owed);
        }

        let first = self.s.read();
        if first != ' ' && first != '\t' {
            self.s.unread();
            return (false, 0);
        }
        let mut n = 1;
        loop {
            let c = self.s.read();
            if c != ' ' && c != '\t' {
                self.s.unread();
                break;
            }
            if n != 0 && c == first {
                n += 1;
            } else {
                n = 0;
            }
        }
        (true, n)
    }

    /// Space or line breaks, any mix.
    fn whitespace(&mut self) -> bool {
        let mut any = false;
        loop {
            let c = self.s.read();
            if c != ' ' && c != '\t' && c != '\n' && c != '\r' {
                self.s.unread();
                break;
            }
            any = true;
        }
        any
    }

    /// NL, CR or CR+NL.
    fn brk(&mut self) -> bool {
        let c = self.s.read();
        if c == '\r' {
            // CR+NL counts once; a lone CR is still a break
            self.next_char_is('\n');
            return true;
        }
        if c == '\n' {
            return true;
        }
        self.s.unread();
        false
    }

    /// True at end of stream. Consumes the end character.
    fn end(&mut self) -> bool {
        let c = self.s.read();
        if is_end_char(c) {
            return true;
        }
        self.s.unread();
        false
    }

    /// `#` up to (not including) the line break. `#` only opens a comment
    /// where the caller permits it: line start, after whitespace, or after
    /// a group close.
    fn comment(&mut self) -> bool {
        if !self.next_char_is('#') {
            return false;
        }
        loop {
            let c = self.s.read();
            if is_break_char(c) || is_end_char(c) {
                self.s.unread();
                return true;
            }
        }
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// Unquoted scalar: text characters, not starting with `#`. A `#`
    /// inside the scalar is a literal character.
    fn string_scalar(&mut self) -> Option<String> {
        let c = self.s.read();
        if !is_text_char(c) || c == '#' {
            self.s.unread();
            return None;
        }
        let mut buf = String::new();
        buf.push(c);
        loop {
            let c = self.s.read();
            if !is_text_char(c) {
                self.s.unread();
                break;
            }
            buf.push(c);
        }
        Some(buf)
    }

    /// Quoted scalar with `"` or `'` delimiters. May span lines;
    /// continuation lines are un-indented by the opening line's
    /// indentation. `\"`, `\'` and `\\` collapse; any other backslash
    /// pair is kept verbatim.
    fn quoted(&mut self) -> Result<Option<String>, SyntaxError> {
        let q = self.s.read();
        if q != '"' && q != '\'' {
            self.s.unread();
            return Ok(None);
        }
        let opening_indent = self.line_indent;
        let mut buf = String::new();
        loop {
            let c = self.s.read();
            if c == q {
                break;
            }
            if is_end_char(c) {
                return Err(self.err("unclosed quoted string"));
            }
            match c {
                '\n' | '\r' => {
                    if c == '\r' {
                        self.next_char_is('\n');
                    }
                    buf.push('\n');
                    let (_, n) = self.space();
                    for _ in 0..n.saturating_sub(opening_indent) {
                        buf.push(' ');
                    }
                }
                '\\' => {
                    let e = self.s.read();
                    if is_end_char(e) {
                        return Err(self.err("unclosed quoted string"));
                    }
                    match e {
                        '"' | '\'' | '\\' => buf.push(e),
                        _ => {
                            buf.push('\\');
                            buf.push(e);
                        }
                    }
                }
                _ => buf.push(c),
            }
        }
        Ok(Some(buf))
    }

    /// Quoted or unquoted scalar.
    fn scalar(&mut self) -> Result<Option<String>, SyntaxError> {
        if let Some(q) = self.quoted()? {
            return Ok(Some(q));
        }
        Ok(self.string_scalar())
    }

    /// Block scalar: `\` + newline, then lines indented deeper than this
    /// line. The block minimum indentation is stripped; indentation beyond
    /// it is preserved. Spaces read past the terminating line are owed
    /// back to the reader.
    fn block(&mut self) -> Result<Option<String>, SyntaxError> {
        if !self.next_char_is('\\') {
            return Ok(None);
        }
        let c = self.s.read();
        if c != '\n' && c != '\r' {
            self.s.unread();
            self.s.unread();
            return Ok(None);
        }
        if c == '\r' {
            self.next_char_is('\n');
        }

        let enclosing = self.line_indent;
        let (sp, first) = self.space();
        if sp && first == 0 {
            return Err(self.err("non-uniform indentation in block"));
        }

        let mut min = first;
        let mut j = first;
        let mut buf = String::new();
        while j > enclosing {
            if j < min {
                min = j;
            }
            for _ in 0..(j - min) {
                buf.push(' ');
            }
            loop {
                let c = self.s.read();
                if c == '\r' {
                    continue;
                }
                if c == '\n' {
                    buf.push('\n');
                    break;
                }
                if is_end_char(c) {
                    break;
                }
                buf.push(c);
            }
            let (sp, k) = self.space();
            if sp && k == 0 {
                return Err(self.err("non-uniform indentation in block"));
            }
            j = k;
        }
        self.s.owe_spaces(j);

        if buf.ends_with('\n') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Token: letters, digits and `_`.
    fn token(&mut self) -> Option<String> {
        let c = self.s.read();
        if !is_token_char(c) {
            self.s.unread();
            return None;
        }
        let mut buf = String::new();
        buf.push(c);
        loop {
            let c = self.s.read();
            if !is_token_char(c) {
                self.s.unread();
                break;
            }
            buf.push(c);
        }
        Some(buf)
    }

    /// Number: optional leading `-`, digits, `.` allowed inside.
    fn number(&mut self) -> Option<String> {
        let c = self.s.read();
        if !is_digit(c) {
            if c != '-' {
                self.s.unread();
                return None;
            }
            let d = self.s.read();
            if !is_digit(d) {
                self.s.unread();
                self.s.unread();
                return None;
            }
            self.s.unread();
        }
        let mut buf = String::new();
        buf.push(c);
        loop {
            let c = self.s.read();
            if !is_digit(c) && c != '.' {
                self.s.unread();
                break;
            }
            buf.push(c);
        }
        Some(buf)
    }

    /// A run of operator characters.
    fn operator(&mut self) -> Option<String> {
        let c = self.s.read();
        if !is_operator_char(c) {
            self.s.unread();
            return None;
        }
        let mut buf = String::new();
        buf.push(c);
        loop {
            let c = self.s.read();
            if !is_operator_char(c) {
                self.s.unread();
                break;
            }
            buf.push(c);
        }
        Some(buf)
    }

    // ========================================================================
    // Lines
    // ========================================================================

    /// Map a line's column to a depth through the indentation table.
    fn get_level(&self, col: usize) -> usize {
        for (d, &c) in self.ind.iter().enumerate() {
            if c >= col {
                return d;
            }
        }
        self.ind.len()
    }

    /// Record the column seen at a depth, filling gaps with the same
    /// column so stale shallow entries cannot capture deeper lines.
    fn set_ind(&mut self, level: usize, col: usize) {
        while self.ind.len() <= level {
            self.ind.push(col);
        }
        self.ind[level] = col;
    }

    /// One line: indentation, then scalars and groups, then an optional
    /// comment or block. Returns false at end of input.
    fn line(&mut self) -> Result<bool, SyntaxError> {
        let (sp, n) = self.space();
        if sp && n == 0 {
            return Err(self.err("non-uniform indentation"));
        }
        if self.end() {
            return Ok(false);
        }
        self.line_indent = n;

        // Tolerate a stray comma at the start of the line.
        if self.next_char_is(',') {
            self.space();
        }

        let base = self.get_level(n);
        self.ev.set_level(base);

        let mut prev_scalar = false;
        let mut had_space = true;
        // Some(true) after an attached group, Some(false) after a detached one.
        let mut after_group: Option<bool> = None;

        loop {
            if self.try_group()? {
                after_group = Some(prev_scalar && !had_space);
                prev_scalar = false;
            } else if self.comment() {
                self.space();
                self.brk();
                break;
            } else if let Some(b) = self.block()? {
                self.ev.add(b);
                self.brk();
                break;
            } else if let Some(sc) = self.scalar()? {
                match after_group.take() {
                    Some(false) => {
                        return Err(self.err("element after group requires a comma"));
                    }
                    Some(true) => {
                        // a call-style group closes its chain; the
                        // sequence resumes at the line's base depth
                        self.ev.set_level(base);
                        self.ev.add(sc);
                    }
                    None => self.ev.add(sc),
                }
                prev_scalar = true;
            } else {
                if self.brk() {
                    break;
                }
                if self.end() {
                    break;
                }
                return Err(self.err("unexpected character"));
            }

            let (sp, _) = self.space();
            had_space = sp;
            if self.next_char_is(',') {
                self.space();
                self.ev.set_level(base);
                after_group = None;
            } else {
                self.ev.inc();
            }
        }

        self.set_ind(base, n);
        let deepest = self.ev.level();
        self.set_ind(deepest, n + 1);
        Ok(true)
    }

    /// Group in line context: `(` Sequence? `)`. The level is the same
    /// before and after.
    fn try_group(&mut self) -> Result<bool, SyntaxError> {
        if !self.next_char_is('(') {
            return Ok(false);
        }
        let lv = self.ev.level();
        self.whitespace();
        self.sequence()?;
        self.whitespace();
        if !self.next_char_is(')') {
            return Err(self.err("missing )"));
        }
        self.ev.set_level(lv);
        Ok(true)
    }

    /// Scalars and groups separated by space (descend) or comma (reset
    /// to the sequence's base level).
    fn sequence(&mut self) -> Result<bool, SyntaxError> {
        let base = self.ev.level();
        let mut any = false;
        let mut was_group = false;
        loop {
            if self.try_group()? {
                was_group = true;
            } else if let Some(sc) = self.scalar()? {
                if was_group {
                    return Err(self.err("element after group requires a comma"));
                }
                self.ev.add(sc);
            } else {
                return Ok(any);
            }
            any = true;

            self.whitespace();
            if self.next_char_is(',') {
                self.whitespace();
                self.ev.set_level(base);
                was_group = false;
            } else {
                self.ev.inc();
            }
        }
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// Path elements become a flat child list under the caller's node.
    /// A dot is required between named elements; `[`, `{` and `(` attach
    /// without one.
    pub(crate) fn path(&mut self) -> Result<bool, SyntaxError> {
        let c = self.s.read();
        self.s.unread();
        if !is_letter(c) {
            return Ok(false);
        }

        let mut begin = true;
        let mut anything = false;
        loop {
            if !self.next_char_is('.') && !begin {
                let c = self.s.read();
                self.s.unread();
                if c != '[' && c != '(' && c != '{' {
                    break;
                }
            }
            begin = false;

            if let Some(q) = self.quoted()? {
                self.ev.add(q);
                anything = true;
                continue;
            }
            if let Some(n) = self.number() {
                self.ev.add(n);
                anything = true;
                continue;
            }
            if let Some(t) = self.token() {
                self.ev.add(t);
                anything = true;
                continue;
            }
            if self.index()? {
                anything = true;
                continue;
            }
            if self.selector()? {
                anything = true;
                continue;
            }
            if self.args()? {
                anything = true;
                continue;
            }
            break;
        }
        Ok(anything)
    }

    /// Index element: `[` Expression `]`.
    fn index(&mut self) -> Result<bool, SyntaxError> {
        if !self.next_char_is('[') {
            return Ok(false);
        }
        let lv = self.ev.level();
        self.ev.add(TYPE_INDEX);
        self.ev.inc();
        self.space();
        self.expression()?;
        self.space();
        if !self.next_char_is(']') {
            return Err(self.err("missing ]"));
        }
        self.ev.set_level(lv);
        Ok(true)
    }

    /// Selector element: `{` Expression? `}`.
    fn selector(&mut self) -> Result<bool, SyntaxError> {
        if !self.next_char_is('{') {
            return Ok(false);
        }
        let lv = self.ev.level();
        self.ev.add(TYPE_SELECTOR);
        self.ev.inc();
        self.space();
        self.expression()?;
        self.space();
        if !self.next_char_is('}') {
            return Err(self.err("missing }"));
        }
        self.ev.set_level(lv);
        Ok(true)
    }

    /// Argument group: `(` ArgList? `)`.
    fn args(&mut self) -> Result<bool, SyntaxError> {
        if !self.next_char_is('(') {
            return Ok(false);
        }
        let lv = self.ev.level();
        self.ev.add(TYPE_GROUP);
        self.ev.inc();
        self.space();
        self.arg_list()?;
        self.space();
        if !self.next_char_is(')') {
            return Err(self.err("missing )"));
        }
        self.ev.set_level(lv);
        Ok(true)
    }

    /// Comma-separated expressions, each under its own expression node.
    fn arg_list(&mut self) -> Result<bool, SyntaxError> {
        let mut any = false;
        loop {
            self.space();
            self.ev.add(TYPE_EXPRESSION);
            self.ev.inc();
            if !self.expression()? {
                self.ev.dec();
                self.ev.delete();
                return Ok(any);
            }
            self.ev.dec();
            any = true;
            self.space();
            self.next_char_is(',');
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Expression operands and operators become a flat child list; the
    /// evaluator applies precedence.
    pub(crate) fn expression(&mut self) -> Result<bool, SyntaxError> {
        if !self.unary_expression()? {
            return Ok(false);
        }
        loop {
            self.space();
            match self.operator() {
                Some(op) => self.ev.add(op),
                None => return Ok(true),
            }
            self.space();
            if !self.unary_expression()? {
                return Ok(false);
            }
        }
    }

    fn unary_expression(&mut self) -> Result<bool, SyntaxError> {
        let c = self.s.read();
        self.s.unread();

        if is_letter(c) {
            self.ev.add(TYPE_PATH);
            self.ev.inc();
            self.path()?;
            self.ev.dec();
            return Ok(true);
        }
        if let Some(n) = self.number() {
            self.ev.add(n);
            return Ok(true);
        }
        if let Some(q) = self.quoted()? {
            self.ev.add(q);
            return Ok(true);
        }
        if let Some(op) = self.operator() {
            self.ev.add(op);
            return self.unary_expression();
        }
        if self.next_char_is('(') {
            self.ev.add(TYPE_GROUP);
            self.ev.inc();
            self.space();
            self.expression()?;
            self.space();
            self.ev.dec();
            if !self.next_char_is(')') {
                return Err(self.err("missing )"));
            }
            return Ok(true);
        }
        Ok(false)
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Template: literal text interleaved with `$` variables.
    pub(crate) fn template(&mut self) -> Result<(), SyntaxError> {
        loop {
            if self.text_run() {
                continue;
            }
            if self.variable()? {
                continue;
            }
            break;
        }
        Ok(())
    }

    /// Literal text up to the next `$` or end of stream, kept as raw
    /// bytes so rendering is verbatim.
    fn text_run(&mut self) -> bool {
        let c = self.s.read();
        if !is_template_text_char(c) {
            self.s.unread();
            return false;
        }
        let mut buf = String::new();
        buf.push(c);
        loop {
            let c = self.s.read();
            if !is_template_text_char(c) {
                self.s.unread();
                break;
            }
            buf.push(c);
        }
        self.ev.add_bytes(buf.into_bytes());
        true
    }

    /// `$path`, `$(expression)`, `${expression}` or `$\` (a literal `$`).
    fn variable(&mut self) -> Result<bool, SyntaxError> {
        if !self.next_char_is('$') {
            return Ok(false);
        }
        if self.next_char_is('\\') {
            self.ev.add("$");
            return Ok(true);
        }

        let lv = self.ev.level();
        let c = self.s.read();
        if c == '(' {
            self.ev.add(TYPE_EXPRESSION);
            self.ev.inc();
            self.expression()?;
            self.space();
            if !self.next_char_is(')') {
                return Err(self.err("missing )"));
            }
        } else {
            self.ev.add(TYPE_PATH);
            self.ev.inc();
            if c != '{' {
                self.s.unread();
            } else {
                self.space();
            }
            self.path()?;
            if c == '{' {
                self.space();
                if !self.next_char_is('}') {
                    return Err(self.err("missing }"));
                }
            }
        }
        self.ev.set_level(lv);
        Ok(true)
    }
}

// ============================================================================
// Parse entry points
// ============================================================================

impl Graph {
    /// Parse OGDL text into a tree. The returned root is an unlabeled
    /// container; the document's top-level nodes are its children.
    pub fn parse(text: &str) -> Result<Graph, SyntaxError> {
        Parser::new(text).parse()
    }

    /// Parse a path such as `a.b[1].{x}` into its AST form.
    pub fn parse_path(text: &str) -> Result<Graph, SyntaxError> {
        let mut p = Parser::new(text);
        p.path()?;
        Ok(p.into_graph(TYPE_PATH))
    }

    /// Parse an expression such as `a + 1 > b` into its AST form.
    pub fn parse_expression(text: &str) -> Result<Graph, SyntaxError> {
        let mut p = Parser::new(text);
        p.expression()?;
        Ok(p.into_graph(TYPE_EXPRESSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_and_comma() {
        let g = Graph::parse("a b c").unwrap();
        assert_eq!(g.text(), "a\n  b\n    c");

        let g = Graph::parse("a b, c").unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.get(1).unwrap().string(), "c");
    }

    #[test]
    fn path_elements_are_flat() {
        let g = Graph::parse_path("a.b.c").unwrap();
        let names: Vec<String> = g.children.iter().map(|c| c.string()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn path_with_index_and_selector() {
        let g = Graph::parse_path("a[1].{x}").unwrap();
        assert_eq!(g.get(0).unwrap().string(), "a");
        assert_eq!(g.get(1).unwrap().string(), TYPE_INDEX);
        assert_eq!(g.get(2).unwrap().string(), TYPE_SELECTOR);
    }

    #[test]
    fn expression_is_a_flat_operand_list() {
        let g = Graph::parse_expression("a + 2 * 3").unwrap();
        assert_eq!(g.len(), 5);
        assert_eq!(g.get(0).unwrap().string(), TYPE_PATH);
        assert_eq!(g.get(1).unwrap().string(), "+");
        assert_eq!(g.get(3).unwrap().string(), "*");
    }

    #[test]
    fn unary_operator_recurses() {
        let g = Graph::parse_expression("!done").unwrap();
        assert_eq!(g.get(0).unwrap().string(), "!");
        assert_eq!(g.get(1).unwrap().string(), TYPE_PATH);
        assert_eq!(g.get(1).unwrap().get(0).unwrap().string(), "done");
    }

    #[test]
    fn unexpected_character_is_an_error() {
        assert!(Graph::parse(") oops").is_err());
    }

    #[test]
    fn mixed_indentation_is_an_error() {
        assert!(Graph::parse("a\n \tb\n").is_err());
    }
}

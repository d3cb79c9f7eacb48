//! One-rune-lookahead reader over a byte source.
//!
//! The parser consumes runes one at a time and occasionally pushes one or
//! two back (speculative productions such as a signed number need two).
//! The reader also tracks the source position for error reporting and
//! holds the spaces a block scalar reads past its own end, so the next
//! line starts with the correct indentation.

/// Sentinel returned at end of input. NUL is classified as an end
/// character, so productions that probe with `is_end_char` terminate
/// naturally.
pub const EOS: char = '\0';

/// Reads runes from a string slice with a small push-back history.
pub struct CharStream<'a> {
    src: &'a str,
    pos: usize,
    /// Positions (and line/column) before the most recent reads.
    saved: Vec<(usize, usize, usize)>,
    line: usize,
    column: usize,
    owed: usize,
}

impl<'a> CharStream<'a> {
    pub fn new(src: &'a str) -> CharStream<'a> {
        CharStream {
            src,
            pos: 0,
            saved: Vec::new(),
            line: 1,
            column: 0,
            owed: 0,
        }
    }

    /// Next rune, or [`EOS`] at end of input.
    pub fn read(&mut self) -> char {
        self.saved.push((self.pos, self.line, self.column));
        if self.saved.len() > 4 {
            self.saved.remove(0);
        }

        let Some(c) = self.src[self.pos..].chars().next() else {
            return EOS;
        };
        let at = self.pos;
        self.pos += c.len_utf8();

        match c {
            '\r' => {
                self.line += 1;
                self.column = 0;
            }
            '\n' => {
                // CR+LF counts as a single break
                if at == 0 || self.src.as_bytes()[at - 1] != b'\r' {
                    self.line += 1;
                }
                self.column = 0;
            }
            _ => self.column += 1,
        }
        c
    }

    /// Undo the most recent `read`. At most four reads can be undone.
    pub fn unread(&mut self) {
        if let Some((pos, line, column)) = self.saved.pop() {
            self.pos = pos;
            self.line = line;
            self.column = column;
        }
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 1-based line of the next read.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Runes since the last line break.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Record indentation consumed past the end of a block scalar. The
    /// next call to `take_owed` returns it.
    pub fn owe_spaces(&mut self, n: usize) {
        self.owed = n;
    }

    /// Spaces owed by a previous block scalar, if any.
    pub fn take_owed(&mut self) -> usize {
        std::mem::take(&mut self.owed)
    }
}

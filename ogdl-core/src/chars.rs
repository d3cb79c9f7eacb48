//! Character classification for the OGDL grammar.
//!
//! These predicates are pure and total. Only `is_letter`, `is_digit` and
//! `is_token_char` consult Unicode tables; the rest operate on the ASCII
//! range.

/// True for every code point above 0x20 that is not an OGDL separator
/// (parenthesis or comma).
#[inline]
pub fn is_text_char(c: char) -> bool {
    (c as u32) > 32 && c != '(' && c != ')' && c != ','
}

/// True for control characters that end the stream: everything below
/// 0x20 except tab, newline and carriage return.
#[inline]
pub fn is_end_char(c: char) -> bool {
    (c as u32) < 32 && c != '\t' && c != '\n' && c != '\r'
}

/// True for newline and carriage return.
#[inline]
pub fn is_break_char(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// True for space and tab.
#[inline]
pub fn is_space_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// True for any character that may appear in the fixed part of a
/// template: everything that does not end the stream and is not `$`.
#[inline]
pub fn is_template_text_char(c: char) -> bool {
    !is_end_char(c) && c != '$'
}

/// True for the characters expressions are built from.
#[inline]
pub fn is_operator_char(c: char) -> bool {
    "+-*/%&|!<>=~^".contains(c)
}

/// True if the character is a letter, as per Unicode.
#[inline]
pub fn is_letter(c: char) -> bool {
    c.is_alphabetic()
}

/// True if the character is a numeric digit, as per Unicode.
#[inline]
pub fn is_digit(c: char) -> bool {
    c.is_numeric()
}

/// True for letters, digits and `_`.
#[inline]
pub fn is_token_char(c: char) -> bool {
    c.is_alphabetic() || c.is_numeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_not_text() {
        assert!(is_text_char('a'));
        assert!(is_text_char('#'));
        assert!(is_text_char('"'));
        assert!(!is_text_char('('));
        assert!(!is_text_char(')'));
        assert!(!is_text_char(','));
        assert!(!is_text_char(' '));
    }

    #[test]
    fn end_chars_exclude_layout_controls() {
        assert!(is_end_char('\0'));
        assert!(is_end_char('\u{1b}'));
        assert!(!is_end_char('\t'));
        assert!(!is_end_char('\n'));
        assert!(!is_end_char('\r'));
        assert!(!is_end_char(' '));
    }

    #[test]
    fn template_text_stops_at_dollar() {
        assert!(is_template_text_char('\n'));
        assert!(is_template_text_char('('));
        assert!(!is_template_text_char('$'));
        assert!(!is_template_text_char('\0'));
    }

    #[test]
    fn token_chars_follow_unicode() {
        assert!(is_token_char('_'));
        assert!(is_token_char('ñ'));
        assert!(is_token_char('7'));
        assert!(!is_token_char('-'));
        assert!(!is_token_char('.'));
    }
}

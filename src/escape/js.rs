//! Escaping for the body of a quoted JavaScript string literal.

use std::fmt::Write;

/// Escapes `raw` so it can sit between `"`, `'` or backtick delimiters.
///
/// `<` and `>` are hex-escaped too: the HTML tokenizer ends a `<script>`
/// element at the first `</script`, before JavaScript ever sees the string.
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\x22"),
            '\'' => out.push_str("\\x27"),
            '`' => out.push_str("\\x60"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_quote_style() {
        assert_eq!(escape(r#"a"b'c`d"#), r"a\x22b\x27c\x60d");
    }

    #[test]
    fn escapes_backslash_before_quote() {
        assert_eq!(escape(r#"\""#), r"\\\x22");
    }

    #[test]
    fn script_close_cannot_survive() {
        let escaped = escape("</script><script>alert(1)</script>");
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert_eq!(&escaped[..10], r"\x3C/scrip");
    }

    #[test]
    fn line_terminators_are_escaped() {
        assert_eq!(escape("a\nb\rc"), r"a\nb\rc");
        assert_eq!(escape("a\u{2028}b\u{2029}"), "a\\u2028b\\u2029");
        assert_eq!(escape("\u{0}\u{1b}"), r"\x00\x1B");
    }

    #[test]
    fn category_injection_is_inert() {
        // `var category = '...';` with a reflected query parameter
        let escaped = escape("';alert(document.cookie);//");
        assert_eq!(escaped, r"\x27;alert(document.cookie);//");
    }
}

//! Entity escaping for HTML text nodes and quoted attribute values.

/// Escapes `& < > " '` as named or numeric character references.
///
/// Both quote characters are always escaped, so the result is safe inside
/// either attribute delimiter as well as in element content.
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    push_escaped(&mut out, raw);
    out
}

pub(crate) fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
}

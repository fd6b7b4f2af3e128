//! Hex escaping for CSS property values.

use std::fmt::Write;

/// Escapes every ASCII non-alphanumeric character as `\HH ` (the trailing
/// space terminates the escape). Non-ASCII characters pass through.
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\0' => out.push_str("\\fffd "),
            c if c.is_ascii_alphanumeric() || !c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "\\{:x} ", c as u32);
            }
        }
    }
    out
}

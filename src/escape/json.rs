//! JSON escaping that stays inert when the JSON lands inside an HTML page.

use serde::Serialize;
use serde_json::Value;

use crate::error::{SanitizationError, SanitizationErrorKind};

/// Escapes `raw` as the body of a JSON string (no surrounding quotes).
pub(crate) fn escape(raw: &str) -> String {
    let quoted = Value::String(raw.to_owned()).to_string();
    let body = &quoted[1..quoted.len() - 1];

    let mut out = String::with_capacity(body.len());
    harden(body, &mut out);
    out
}

/// Serializes a whole JSON document and hardens it for inline `<script>` use.
pub(crate) fn escape_document<T>(value: &T) -> Result<String, SanitizationError>
where
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(value).map_err(|error| {
        SanitizationError::new(
            SanitizationErrorKind::MalformedInput,
            format!("value is not representable as JSON: {error}"),
        )
    })?;

    let mut out = String::with_capacity(text.len());
    harden(&text, &mut out);
    Ok(out)
}

/// Rewrites characters that are legal in JSON text but meaningful to the
/// HTML tokenizer into `\uXXXX` escapes.
///
/// Outside string literals JSON text never contains `< > & '`, so every
/// rewrite happens inside a string and preserves its decoded value.
/// Structural `"` are left alone; an escaped `\"` becomes `\u0022`.
fn harden(json: &str, out: &mut String) {
    let mut chars = json.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('"') => out.push_str("\\u0022"),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\'' => out.push_str("\\u0027"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
}

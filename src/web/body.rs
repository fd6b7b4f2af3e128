//! Typed request bodies.
//!
//! Bodies are parsed straight into a handler-declared schema. Fields typed
//! as [`TrustedString`](crate::TrustedString) come out untrusted, so a
//! schema cannot smuggle a body field past the escapers.

use percent_encoding::percent_decode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BodyError;

/// Parses a JSON body into `T`.
///
/// # Errors
///
/// Returns [`BodyError::Json`] if the bytes are not valid UTF-8 JSON or do
/// not match `T`.
///
/// # Examples
///
/// ```
/// use escape_core::web::parse_json_body;
/// use escape_core::TrustedString;
///
/// #[derive(serde::Deserialize)]
/// struct NewTask {
///     title: TrustedString,
///     priority: u8,
/// }
///
/// let task: NewTask = parse_json_body(br#"{"title": "<i>x</i>", "priority": 2}"#).unwrap();
/// assert!(task.title.is_untrusted());
/// assert_eq!(task.priority, 2);
/// ```
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BodyError> {
    Ok(serde_json::from_slice(body)?)
}

/// Parses an `application/x-www-form-urlencoded` body into `T`.
///
/// Every field is a string; a repeated field keeps its last value. Unlike
/// query strings, a field that is not valid UTF-8 after percent-decoding
/// is rejected instead of being replaced.
///
/// # Errors
///
/// Returns [`BodyError::MalformedForm`] for undecodable fields and
/// [`BodyError::Json`] when the fields do not match `T`.
///
/// # Examples
///
/// ```
/// use escape_core::web::parse_form_body;
/// use escape_core::TrustedString;
///
/// #[derive(serde::Deserialize)]
/// struct Comment {
///     author: TrustedString,
///     body: TrustedString,
/// }
///
/// let comment: Comment = parse_form_body(b"author=eve&body=%3Cscript%3E").unwrap();
/// assert_eq!(comment.body.expose_raw(), "<script>");
/// ```
pub fn parse_form_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BodyError> {
    let mut fields = Map::new();

    for (position, pair) in body.split(|&b| b == b'&').enumerate() {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = match pair.iter().position(|&b| b == b'=') {
            Some(split) => (&pair[..split], &pair[split + 1..]),
            None => (pair, &[][..]),
        };

        let name = decode_form_component(name).ok_or_else(|| BodyError::MalformedForm {
            field: format!("#{position}"),
        })?;
        let value = decode_form_component(value).ok_or_else(|| BodyError::MalformedForm {
            field: name.clone(),
        })?;

        fields.insert(name, Value::String(value));
    }

    tracing::trace!(fields = fields.len(), "form body parsed");
    Ok(serde_json::from_value(Value::Object(fields))?)
}

fn decode_form_component(raw: &[u8]) -> Option<String> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trusted::TrustedString;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Comment {
        author: TrustedString,
        body: TrustedString,
    }

    #[test]
    fn json_fields_are_untrusted() {
        let comment: Comment =
            parse_json_body(br#"{"author": "eve", "body": "<script>x</script>"}"#).unwrap();

        assert!(comment.author.is_untrusted());
        assert!(comment.body.is_untrusted());
        assert_eq!(comment.body.expose_raw(), "<script>x</script>");
    }

    #[test]
    fn json_schema_mismatch_is_rejected() {
        let result = parse_json_body::<Comment>(br#"{"author": "eve"}"#);
        assert!(matches!(result, Err(BodyError::Json(_))));
    }

    #[test]
    fn json_invalid_utf8_is_rejected() {
        let result = parse_json_body::<Comment>(b"{\"author\": \"\xff\", \"body\": \"\"}");
        assert!(matches!(result, Err(BodyError::Json(_))));
    }

    #[test]
    fn form_fields_are_decoded() {
        let comment: Comment =
            parse_form_body(b"author=a+b&body=%22%3E%3Cimg%20src%3Dx%3E&&").unwrap();

        assert_eq!(comment.author.expose_raw(), "a b");
        assert_eq!(comment.body.expose_raw(), "\"><img src=x>");
        assert!(comment.body.is_untrusted());
    }

    #[test]
    fn form_last_value_wins() {
        let comment: Comment = parse_form_body(b"author=a&author=b&body").unwrap();
        assert_eq!(comment.author.expose_raw(), "b");
        assert_eq!(comment.body.expose_raw(), "");
    }

    #[test]
    fn form_invalid_utf8_is_rejected() {
        let result = parse_form_body::<Comment>(b"author=eve&body=%FF%FE");
        match result {
            Err(BodyError::MalformedForm { field }) => assert_eq!(field, "body"),
            other => panic!("expected malformed form, got {other:?}"),
        }

        let result = parse_form_body::<Comment>(b"%C3=x");
        assert!(matches!(result, Err(BodyError::MalformedForm { ref field }) if field == "#0"));
    }

    #[test]
    fn form_missing_field_is_schema_error() {
        let result = parse_form_body::<Comment>(b"author=eve");
        assert!(matches!(result, Err(BodyError::Json(_))));
    }
}

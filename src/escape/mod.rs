//! The escaper engine: turns raw text into a [`TrustedString`] for a context.
//!
//! Every function here is pure. Results carry
//! [`TrustTag::SanitizedFor`](crate::TrustTag::SanitizedFor) the requested
//! context and are accepted only by sinks of that context.

mod css;
mod html;
mod js;
mod json;
mod uri;

pub use uri::BLOCKED_URL_PLACEHOLDER;

pub(crate) use html::push_escaped as push_html_escaped;
pub(crate) use uri::check_navigable;

use serde::Serialize;

use crate::context::{Context, Quote, UrlKind};
use crate::error::{SanitizationError, SanitizationErrorKind};
use crate::policy::SanitizationPolicy;
use crate::rich::RichContentDocument;
use crate::trusted::{TrustTag, TrustedString};

/// Escapes `raw` for `context` under `policy`.
///
/// `AllowSubset` only has an effect for [`Context::HtmlBody`]; any other
/// context escapes everything.
///
/// Escaping is total over valid text, so the only error path is
/// [`escape_bytes`] rejecting invalid UTF-8. The `Result` is kept so
/// callers handle both entry points the same way.
///
/// # Examples
///
/// ```
/// use escape_core::{escape, AllowList, Context, SanitizationPolicy};
///
/// let comment = escape("<img src=x onerror=alert(1)>", Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
/// assert_eq!(comment.sanitized_str(), Some("&lt;img src=x onerror=alert(1)&gt;"));
///
/// let policy = SanitizationPolicy::AllowSubset(AllowList::new().tag("b"));
/// let notes = escape("<b>ok</b><script>bad()</script>", Context::HtmlBody, &policy).unwrap();
/// assert_eq!(notes.sanitized_str(), Some("<b>ok</b>"));
/// ```
pub fn escape(
    raw: &str,
    context: Context,
    policy: &SanitizationPolicy,
) -> Result<TrustedString, SanitizationError> {
    let value = match policy {
        SanitizationPolicy::AllowSubset(allow) if context.accepts_markup() => {
            RichContentDocument::parse(raw, allow).to_html()
        }
        _ => escape_for(raw, context),
    };

    Ok(TrustedString::sanitized(value, context))
}

/// Escapes raw bytes, rejecting anything that is not valid UTF-8.
///
/// # Errors
///
/// Returns [`SanitizationErrorKind::MalformedInput`]. Invalid input is never
/// passed through or lossily repaired.
pub fn escape_bytes(
    raw: &[u8],
    context: Context,
    policy: &SanitizationPolicy,
) -> Result<TrustedString, SanitizationError> {
    let text = std::str::from_utf8(raw).map_err(|error| {
        SanitizationError::new(
            SanitizationErrorKind::MalformedInput,
            format!("invalid UTF-8 after byte {}", error.valid_up_to()),
        )
    })?;

    escape(text, context, policy)
}

/// Escapes UTF-16 code units, rejecting unpaired surrogates.
///
/// # Errors
///
/// Returns [`SanitizationErrorKind::MalformedInput`].
pub fn escape_utf16(
    raw: &[u16],
    context: Context,
    policy: &SanitizationPolicy,
) -> Result<TrustedString, SanitizationError> {
    let text = String::from_utf16(raw).map_err(|_| {
        SanitizationError::new(
            SanitizationErrorKind::MalformedInput,
            "unpaired UTF-16 surrogate",
        )
    })?;

    escape(&text, context, policy)
}

/// Serializes `value` as a JSON document that can be embedded in an inline
/// `<script>` element.
///
/// # Errors
///
/// Returns [`SanitizationErrorKind::MalformedInput`] when `value` cannot be
/// represented as JSON (for example a map with non-string keys).
///
/// ```
/// use escape_core::{escape_json, Context, TrustTag};
///
/// let stats = serde_json::json!({"latest_task_title": "</script><script>alert(1)"});
/// let json = escape_json(&stats).unwrap();
///
/// assert_eq!(json.trust(), TrustTag::SanitizedFor(Context::JsonValue));
/// assert!(!json.sanitized_str().unwrap().contains("</script"));
/// ```
pub fn escape_json<T>(value: &T) -> Result<TrustedString, SanitizationError>
where
    T: Serialize + ?Sized,
{
    let document = json::escape_document(value)?;
    Ok(TrustedString::sanitized(document, Context::JsonValue))
}

/// Resolves the attribute context for the delimiter a template uses.
///
/// # Errors
///
/// Returns [`SanitizationErrorKind::UnquotedAttribute`] for `None` or any
/// character other than `"` and `'`. No escaping makes an unquoted
/// attribute safe.
///
/// ```
/// use escape_core::{attribute_context, Context, Quote, SanitizationErrorKind};
///
/// assert_eq!(attribute_context(Some('\'')).unwrap(), Context::HtmlAttribute(Quote::Single));
/// assert_eq!(attribute_context(None).unwrap_err().kind(), SanitizationErrorKind::UnquotedAttribute);
/// ```
pub fn attribute_context(delimiter: Option<char>) -> Result<Context, SanitizationError> {
    delimiter
        .and_then(Quote::from_delimiter)
        .map(Context::HtmlAttribute)
        .ok_or_else(|| {
            SanitizationError::new(
                SanitizationErrorKind::UnquotedAttribute,
                "attribute values must be quoted with \" or '",
            )
        })
}

/// Escapes everything for `context`.
pub(crate) fn escape_for(raw: &str, context: Context) -> String {
    match context {
        Context::HtmlBody | Context::HtmlAttribute(_) => html::escape(raw),
        Context::UrlComponent(UrlKind::Component) => uri::encode_component(raw),
        Context::UrlComponent(UrlKind::Navigable) => uri::guard_navigable(raw),
        Context::JsStringLiteral => js::escape(raw),
        Context::JsonValue => json::escape(raw),
        Context::CssValue => css::escape(raw),
    }
}

/// A sanitizer bound to one output context.
///
/// Implementors MUST return a value tagged for [`Sanitizer::context`] or an
/// error; they never return the input's raw text under a sanitized tag.
pub trait Sanitizer {
    /// The context every successful result is sanitized for.
    fn context(&self) -> Context;

    /// Sanitizes `input` for [`Sanitizer::context`].
    ///
    /// # Errors
    ///
    /// Returns [`SanitizationError`] when the input cannot be sanitized.
    fn sanitize(&self, input: TrustedString) -> Result<TrustedString, SanitizationError>;
}

/// Sanitizer for one call site: a context plus the policy for that site.
///
/// Re-sanitizing a value already sanitized for the same context returns it
/// unchanged, so `&amp;` never becomes `&amp;amp;`.
///
/// # Examples
///
/// ```
/// use escape_core::{Context, ContextSanitizer, SanitizationPolicy, Sanitizer, TrustedString};
///
/// let sanitizer = ContextSanitizer::new(Context::HtmlBody, SanitizationPolicy::EscapeAll);
///
/// let once = sanitizer.sanitize(TrustedString::untrusted("a & b")).unwrap();
/// let twice = sanitizer.sanitize(once.clone()).unwrap();
///
/// assert_eq!(twice, once);
/// assert_eq!(twice.sanitized_str(), Some("a &amp; b"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSanitizer {
    context: Context,
    policy: SanitizationPolicy,
}

impl ContextSanitizer {
    /// Creates a sanitizer for `context` using `policy`.
    pub fn new(context: Context, policy: SanitizationPolicy) -> Self {
        Self { context, policy }
    }

    /// Returns the policy applied to untrusted input.
    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }
}

impl Sanitizer for ContextSanitizer {
    fn context(&self) -> Context {
        self.context
    }

    fn sanitize(&self, input: TrustedString) -> Result<TrustedString, SanitizationError> {
        match input.trust() {
            TrustTag::Untrusted => escape(input.expose_raw(), self.context, &self.policy),
            TrustTag::SanitizedFor(context) if context == self.context => Ok(input),
            TrustTag::Nested { outer, .. } if outer == self.context => Ok(input),
            found => Err(SanitizationError::new(
                SanitizationErrorKind::ContextMismatch,
                format!(
                    "value is {found}, not {}; escape it from its raw source instead",
                    self.context
                ),
            )),
        }
    }
}

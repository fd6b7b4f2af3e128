use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::context::{Context, UrlKind};
use crate::error::{SanitizationError, SanitizationErrorKind};
use crate::escape;

/// Provenance of a [`TrustedString`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustTag {
    /// Raw input that has not been escaped for any context.
    Untrusted,
    /// Escaped exactly once for the given context.
    SanitizedFor(Context),
    /// Escaped for `inner`, then that whole result escaped again for `outer`
    /// (a URL inside an attribute, a JS string inside an event handler).
    Nested {
        /// The context the value was first escaped for.
        inner: Context,
        /// The context the value is now safe to be emitted into.
        outer: Context,
    },
}

impl fmt::Display for TrustTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustTag::Untrusted => write!(f, "untrusted"),
            TrustTag::SanitizedFor(ctx) => write!(f, "sanitized-for:{ctx}"),
            TrustTag::Nested { inner, outer } => write!(f, "sanitized-for:{inner}>{outer}"),
        }
    }
}

/// A string paired with the trust tag describing where it may be emitted.
///
/// Values are immutable. Escaping, nesting and joining each produce a new
/// `TrustedString`; nothing changes a value's tag in place.
///
/// # Security Properties
///
/// - Only crate code can produce a sanitized tag from runtime data
/// - Does NOT implement `Display`, `Deref`, `AsRef<str>` or `From<String>`
/// - Deserializing always yields [`TrustTag::Untrusted`]
///
/// # Examples
///
/// ```
/// use escape_core::{escape, Context, SanitizationPolicy, TrustTag, TrustedString};
///
/// let input = TrustedString::untrusted("<b>hi</b>");
/// assert_eq!(input.trust(), TrustTag::Untrusted);
/// assert_eq!(input.sanitized_str(), None);
///
/// let safe = escape(input.expose_raw(), Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
/// assert_eq!(safe.trust(), TrustTag::SanitizedFor(Context::HtmlBody));
/// assert_eq!(safe.sanitized_str(), Some("&lt;b&gt;hi&lt;/b&gt;"));
/// ```
// The fields MUST remain private: a public `trust` would let callers relabel
// raw input as sanitized and skip the escaper entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedString {
    value: String,
    trust: TrustTag,
}

impl TrustedString {
    /// Wraps raw input as [`TrustTag::Untrusted`].
    pub fn untrusted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            trust: TrustTag::Untrusted,
        }
    }

    /// Wraps developer-authored markup that is already valid for `context`.
    ///
    /// Only `&'static str` is accepted, which keeps request data out in
    /// ordinary code. It is not a guarantee: a leaked `String` is also
    /// `'static`. Callers are trusted to pass only markup written in source.
    ///
    /// ```
    /// use escape_core::{Context, TrustTag, TrustedString};
    ///
    /// let prefix = TrustedString::literal("Notification: ", Context::HtmlBody);
    /// assert_eq!(prefix.trust(), TrustTag::SanitizedFor(Context::HtmlBody));
    /// ```
    pub fn literal(value: &'static str, context: Context) -> Self {
        Self {
            value: value.to_string(),
            trust: TrustTag::SanitizedFor(context),
        }
    }

    /// Creates a value escaped for `context`.
    ///
    /// Callers MUST have run `value` through the escaper for exactly this
    /// context.
    pub(crate) fn sanitized(value: String, context: Context) -> Self {
        Self {
            value,
            trust: TrustTag::SanitizedFor(context),
        }
    }

    /// Returns the trust tag.
    pub fn trust(&self) -> TrustTag {
        self.trust
    }

    /// Returns `true` if the value has not been escaped.
    pub fn is_untrusted(&self) -> bool {
        self.trust == TrustTag::Untrusted
    }

    /// Returns the escaped text, or `None` for untrusted input.
    pub fn sanitized_str(&self) -> Option<&str> {
        match self.trust {
            TrustTag::Untrusted => None,
            _ => Some(&self.value),
        }
    }

    /// Returns the underlying text regardless of trust.
    ///
    /// Use this for validation, comparison and persistence. Stored values
    /// should be re-wrapped with [`TrustedString::untrusted`] when loaded.
    /// Never interpolate the result into output.
    pub fn expose_raw(&self) -> &str {
        &self.value
    }

    /// Returns the length of the underlying text in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns `true` if the underlying text is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Concatenates two values carrying the same trust tag.
    ///
    /// A joined navigable URL is checked again as a whole, since two
    /// harmless relative pieces can spell out a `javascript:` URL. Navigable
    /// URLs that are already nested in an attribute cannot be joined; join
    /// them before nesting.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizationErrorKind::ContextMismatch`] when the tags
    /// differ (two strings escaped for different contexts do not form a
    /// string escaped for either), when a joined navigable URL fails the
    /// scheme check, or when the values are nested navigable URLs.
    ///
    /// ```
    /// use escape_core::{escape, Context, SanitizationPolicy, TrustedString};
    ///
    /// let prefix = TrustedString::literal("Hello, ", Context::HtmlBody);
    /// let name = escape("<Bob>", Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
    ///
    /// let greeting = prefix.join(&name).unwrap();
    /// assert_eq!(greeting.sanitized_str(), Some("Hello, &lt;Bob&gt;"));
    /// ```
    pub fn join(&self, other: &TrustedString) -> Result<TrustedString, SanitizationError> {
        if self.trust != other.trust {
            return Err(SanitizationError::new(
                SanitizationErrorKind::ContextMismatch,
                format!("cannot join {} with {}", self.trust, other.trust),
            ));
        }

        let mut value = String::with_capacity(self.value.len() + other.value.len());
        value.push_str(&self.value);
        value.push_str(&other.value);

        match self.trust {
            TrustTag::SanitizedFor(Context::UrlComponent(UrlKind::Navigable)) => {
                value = escape::check_navigable(&value).ok_or_else(|| {
                    SanitizationError::new(
                        SanitizationErrorKind::ContextMismatch,
                        "joined URL is not a navigable http(s) or relative URL",
                    )
                })?;
            }
            TrustTag::Nested {
                inner: Context::UrlComponent(UrlKind::Navigable),
                ..
            } => {
                return Err(SanitizationError::new(
                    SanitizationErrorKind::ContextMismatch,
                    format!("cannot join nested URLs tagged {}", self.trust),
                ));
            }
            _ => {}
        }

        Ok(Self {
            value,
            trust: self.trust,
        })
    }

    /// Re-escapes a sanitized value for an enclosing context.
    ///
    /// The value must be [`TrustTag::SanitizedFor`] a context that
    /// [`embeds_in`](Context::embeds_in) `outer`. A URL component nested in
    /// a navigable URL stays in URL syntax and is tagged
    /// `SanitizedFor(UrlComponent(Navigable))`; every other composition is
    /// tagged [`TrustTag::Nested`].
    ///
    /// # Errors
    ///
    /// Returns [`SanitizationErrorKind::InvalidNesting`] for untrusted or
    /// already nested values and for compositions that are not allowed.
    ///
    /// ```
    /// use escape_core::{escape, Context, Quote, SanitizationPolicy, TrustTag, UrlKind};
    ///
    /// let href = Context::UrlComponent(UrlKind::Navigable);
    /// let attr = Context::HtmlAttribute(Quote::Double);
    ///
    /// let url = escape("/search?q=a&b", href, &SanitizationPolicy::EscapeAll).unwrap();
    /// let nested = url.nest(attr).unwrap();
    ///
    /// assert_eq!(nested.trust(), TrustTag::Nested { inner: href, outer: attr });
    /// assert_eq!(nested.sanitized_str(), Some("/search?q=a&amp;b"));
    /// ```
    pub fn nest(self, outer: Context) -> Result<TrustedString, SanitizationError> {
        let inner = match self.trust {
            TrustTag::SanitizedFor(inner) if inner.embeds_in(outer) => inner,
            found => {
                return Err(SanitizationError::new(
                    SanitizationErrorKind::InvalidNesting,
                    format!("cannot nest {found} inside {outer}"),
                ));
            }
        };

        let value = escape::escape_for(&self.value, outer);
        let trust = match (inner, outer) {
            (Context::UrlComponent(_), Context::UrlComponent(UrlKind::Navigable)) => {
                TrustTag::SanitizedFor(outer)
            }
            _ => TrustTag::Nested { inner, outer },
        };

        Ok(Self { value, trust })
    }
}

/// Request bodies deserialize straight into `TrustedString` fields, and
/// every such field starts out untrusted.
///
/// ```
/// use escape_core::TrustedString;
///
/// #[derive(serde::Deserialize)]
/// struct Comment {
///     body: TrustedString,
/// }
///
/// let comment: Comment = serde_json::from_str(r#"{"body": "<script>"}"#).unwrap();
/// assert!(comment.body.is_untrusted());
/// ```
impl<'de> Deserialize<'de> for TrustedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(TrustedString::untrusted)
    }
}

// Do NOT add Display, Deref, AsRef<str>, Borrow<str> or From<String>. Each
// of them lets a TrustedString be formatted into output without a sink.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Quote;

    #[test]
    fn untrusted_has_no_sanitized_view() {
        let value = TrustedString::untrusted("<script>alert(1)</script>");

        assert!(value.is_untrusted());
        assert_eq!(value.sanitized_str(), None);
        assert_eq!(value.expose_raw(), "<script>alert(1)</script>");
    }

    #[test]
    fn debug_shows_trust_tag() {
        let value = TrustedString::untrusted("payload");
        let debug_output = format!("{:?}", value);

        assert!(debug_output.contains("Untrusted"));
        assert!(debug_output.contains("payload"));
    }

    #[test]
    fn literal_is_sanitized_for_its_context() {
        let value = TrustedString::literal("<p>", Context::HtmlBody);

        assert_eq!(value.trust(), TrustTag::SanitizedFor(Context::HtmlBody));
        assert_eq!(value.sanitized_str(), Some("<p>"));
    }

    #[test]
    fn join_requires_identical_tags() {
        let body = TrustedString::literal("a", Context::HtmlBody);
        let attr = TrustedString::literal("b", Context::HtmlAttribute(Quote::Double));

        let error = body.join(&attr).unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::ContextMismatch);

        let joined = body.join(&body).unwrap();
        assert_eq!(joined.sanitized_str(), Some("aa"));
    }

    #[test]
    fn joining_untrusted_stays_untrusted() {
        let a = TrustedString::untrusted("<");
        let b = TrustedString::untrusted("script>");

        let joined = a.join(&b).unwrap();
        assert!(joined.is_untrusted());
    }

    #[test]
    fn joined_url_pieces_cannot_form_a_script_url() {
        let navigable = Context::UrlComponent(UrlKind::Navigable);
        let scheme = escape::escape("javascript", navigable, &Default::default()).unwrap();
        let body = escape::escape(":alert(document.cookie)", navigable, &Default::default()).unwrap();
        assert_eq!(scheme.sanitized_str(), Some("javascript"));

        let error = scheme.join(&body).unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::ContextMismatch);
    }

    #[test]
    fn joined_url_pieces_are_checked_as_one_url() {
        let navigable = Context::UrlComponent(UrlKind::Navigable);
        let base = escape::escape("https://example.com", navigable, &Default::default()).unwrap();
        let path = escape::escape("a b", navigable, &Default::default()).unwrap();

        let joined = base.join(&path).unwrap();
        assert_eq!(joined.trust(), TrustTag::SanitizedFor(navigable));
        assert_eq!(joined.sanitized_str(), Some("https://example.com/a%20b"));
    }

    #[test]
    fn nested_urls_cannot_be_joined() {
        let navigable = Context::UrlComponent(UrlKind::Navigable);
        let attr = Context::HtmlAttribute(Quote::Double);
        let scheme = TrustedString::sanitized("javascript".to_string(), navigable)
            .nest(attr)
            .unwrap();
        let body = TrustedString::sanitized(":alert(1)".to_string(), navigable)
            .nest(attr)
            .unwrap();

        let error = scheme.join(&body).unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::ContextMismatch);
    }

    #[test]
    fn nest_rejects_untrusted() {
        let raw = TrustedString::untrusted("javascript:alert(1)");

        let error = raw
            .nest(Context::HtmlAttribute(Quote::Double))
            .unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::InvalidNesting);
    }

    #[test]
    fn nest_rejects_disallowed_composition() {
        let body = TrustedString::sanitized("x".to_string(), Context::HtmlBody);

        let error = body.nest(Context::JsStringLiteral).unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::InvalidNesting);
    }

    #[test]
    fn nest_rejects_double_nesting() {
        let js = TrustedString::sanitized("x".to_string(), Context::JsStringLiteral);
        let nested = js.nest(Context::HtmlAttribute(Quote::Single)).unwrap();

        let error = nested
            .nest(Context::HtmlAttribute(Quote::Double))
            .unwrap_err();
        assert_eq!(error.kind(), SanitizationErrorKind::InvalidNesting);
    }

    #[test]
    fn component_nested_in_navigable_is_plain_url() {
        let component = TrustedString::sanitized(
            "a%20b".to_string(),
            Context::UrlComponent(UrlKind::Component),
        );

        let nested = component
            .nest(Context::UrlComponent(UrlKind::Navigable))
            .unwrap();
        assert_eq!(
            nested.trust(),
            TrustTag::SanitizedFor(Context::UrlComponent(UrlKind::Navigable))
        );
        assert_eq!(nested.sanitized_str(), Some("a%20b"));
    }

    #[test]
    fn js_string_in_attribute_is_entity_escaped() {
        let js = TrustedString::sanitized(r"it\x27s & more".to_string(), Context::JsStringLiteral);

        let nested = js.nest(Context::HtmlAttribute(Quote::Double)).unwrap();
        assert_eq!(nested.sanitized_str(), Some(r"it\x27s &amp; more"));
    }

    #[test]
    fn deserialize_is_always_untrusted() {
        let value: TrustedString = serde_json::from_str("\"&lt;already escaped&gt;\"").unwrap();

        assert!(value.is_untrusted());
        assert_eq!(value.expose_raw(), "&lt;already escaped&gt;");
    }

    #[test]
    fn tag_display() {
        assert_eq!(TrustTag::Untrusted.to_string(), "untrusted");
        assert_eq!(
            TrustTag::SanitizedFor(Context::CssValue).to_string(),
            "sanitized-for:css_value"
        );
        assert_eq!(
            TrustTag::Nested {
                inner: Context::UrlComponent(UrlKind::Navigable),
                outer: Context::HtmlAttribute(Quote::Double),
            }
            .to_string(),
            "sanitized-for:url_component(navigable)>html_attribute(double)"
        );
    }

    mod proptests {
        use super::*;
        use crate::test_utils::arb_text;
        use proptest::prelude::*;

        proptest! {
            /// Property: joining never changes a shared tag and preserves both parts in order
            #[test]
            fn proptest_join_preserves_parts(a in arb_text(64), b in arb_text(64)) {
                let left = TrustedString::untrusted(a.clone());
                let right = TrustedString::untrusted(b.clone());

                let joined = left.join(&right).expect("same tag");
                prop_assert_eq!(joined.trust(), TrustTag::Untrusted);
                prop_assert_eq!(joined.expose_raw(), format!("{a}{b}"));
            }
        }
    }
}

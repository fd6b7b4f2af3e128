//! Output contexts and the rules for nesting one inside another.
//!
//! A [`Context`] names the syntactic position a string is about to be placed
//! into. Each context has its own escaping rules and contexts are never
//! substitutable: text escaped for an HTML text node is not safe inside a
//! `<script>` string, and a percent-encoded query value is not safe as a
//! whole `href`.

use std::fmt;

/// The delimiter surrounding an HTML attribute value.
///
/// There is deliberately no `Unquoted` variant. An unquoted attribute value
/// can be terminated by whitespace, `/`, `>` and several other characters, so
/// no escaping makes it safe; such sinks cannot be expressed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// `attr="..."`
    Double,
    /// `attr='...'`
    Single,
}

impl Quote {
    /// Maps a delimiter character to a `Quote`.
    ///
    /// Returns `None` for anything other than `"` or `'`, which is how an
    /// unquoted attribute position is rejected when it comes from data
    /// (configuration, template metadata) instead of code.
    ///
    /// # Examples
    ///
    /// ```
    /// use escape_core::Quote;
    ///
    /// assert_eq!(Quote::from_delimiter('"'), Some(Quote::Double));
    /// assert_eq!(Quote::from_delimiter(' '), None);
    /// ```
    pub fn from_delimiter(delimiter: char) -> Option<Self> {
        match delimiter {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            _ => None,
        }
    }

    /// Returns the delimiter character.
    pub fn delimiter(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

/// How a URL-context value is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// A single component (query value, path segment). Everything outside
    /// the RFC 3986 unreserved set is percent-encoded.
    Component,
    /// A complete URL the browser may navigate to or fetch (`href`, `src`,
    /// `location`, webhook targets). Only `http`/`https` or relative URLs
    /// survive; anything else becomes a harmless placeholder.
    Navigable,
}

/// The closed set of output contexts.
///
/// # Examples
///
/// ```
/// use escape_core::{Context, Quote, UrlKind};
///
/// let href = Context::UrlComponent(UrlKind::Navigable);
/// assert!(href.embeds_in(Context::HtmlAttribute(Quote::Double)));
/// assert!(!Context::HtmlBody.embeds_in(Context::JsStringLiteral));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Text content of an HTML element.
    HtmlBody,
    /// The value of a quoted HTML attribute.
    HtmlAttribute(Quote),
    /// A URL or URL component.
    UrlComponent(UrlKind),
    /// The body of a quoted JavaScript string literal.
    JsStringLiteral,
    /// The body of a JSON string value, safe to embed inside an HTML document.
    JsonValue,
    /// A CSS property value.
    CssValue,
}

impl Context {
    /// Every context, in declaration order.
    pub const ALL: [Context; 8] = [
        Context::HtmlBody,
        Context::HtmlAttribute(Quote::Double),
        Context::HtmlAttribute(Quote::Single),
        Context::UrlComponent(UrlKind::Component),
        Context::UrlComponent(UrlKind::Navigable),
        Context::JsStringLiteral,
        Context::JsonValue,
        Context::CssValue,
    ];

    /// Returns `true` if a value sanitized for `self` may be re-escaped for
    /// `outer` and placed inside it.
    ///
    /// Allowed compositions:
    /// - a URL component inside a navigable URL
    /// - a URL, JS string, CSS value or JSON value inside a quoted attribute
    pub fn embeds_in(self, outer: Context) -> bool {
        matches!(
            (self, outer),
            (
                Context::UrlComponent(UrlKind::Component),
                Context::UrlComponent(UrlKind::Navigable)
            ) | (
                Context::UrlComponent(_)
                    | Context::JsStringLiteral
                    | Context::CssValue
                    | Context::JsonValue,
                Context::HtmlAttribute(_)
            )
        )
    }

    /// Returns `true` for contexts where rich markup can exist at all.
    pub fn accepts_markup(self) -> bool {
        matches!(self, Context::HtmlBody)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::HtmlBody => write!(f, "html_body"),
            Context::HtmlAttribute(Quote::Double) => write!(f, "html_attribute(double)"),
            Context::HtmlAttribute(Quote::Single) => write!(f, "html_attribute(single)"),
            Context::UrlComponent(UrlKind::Component) => write!(f, "url_component"),
            Context::UrlComponent(UrlKind::Navigable) => write!(f, "url_component(navigable)"),
            Context::JsStringLiteral => write!(f, "js_string_literal"),
            Context::JsonValue => write!(f, "json_value"),
            Context::CssValue => write!(f, "css_value"),
        }
    }
}

//! Percent-encoding and scheme checks for URL contexts.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use url::{ParseError, Url};

/// Everything except the RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters that must never appear literally in a navigable URL. The URL
/// delimiters (`: / ? # & =`) are kept so the URL still works.
const NAVIGABLE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'\\');

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Substituted for navigable URLs whose scheme is not allowed.
pub const BLOCKED_URL_PLACEHOLDER: &str = "about:blank";

pub(crate) fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

pub(crate) fn guard_navigable(raw: &str) -> String {
    check_navigable(raw).unwrap_or_else(|| BLOCKED_URL_PLACEHOLDER.to_string())
}

/// Returns the encoded URL, or `None` when it must not be navigated to.
///
/// Absolute URLs go through the WHATWG parser, which strips the leading
/// whitespace and embedded tabs/newlines browsers ignore, so
/// `" java\tscript:"` is seen as the `javascript` scheme it really is.
/// Relative URLs (including `//host/...`) inherit the page's scheme and are
/// allowed.
pub(crate) fn check_navigable(raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) if ALLOWED_SCHEMES.contains(&url.scheme()) => {
            Some(utf8_percent_encode(url.as_str(), NAVIGABLE).to_string())
        }
        Ok(url) => {
            tracing::warn!(scheme = url.scheme(), "blocked navigable URL scheme");
            None
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let trimmed = raw.trim_matches(|c: char| c <= ' ');
            Some(utf8_percent_encode(trimmed, NAVIGABLE).to_string())
        }
        Err(error) => {
            tracing::warn!(%error, "blocked unparseable navigable URL");
            None
        }
    }
}

//! Lightweight inline formatting for rich-text fields.
//!
//! `**bold**`, `*italic*` and `` `code` `` become `<b>`, `<i>` and `<code>`;
//! line breaks become `<br>`. The user's own text is entity escaped before
//! markers are converted, so typed markup is shown, never interpreted. The
//! result is then pruned like any other `AllowSubset` input.

use crate::context::Context;
use crate::escape::push_html_escaped;
use crate::policy::AllowList;
use crate::rich::RichContentDocument;
use crate::trusted::TrustedString;

/// Renders inline markers in `raw` as HTML body content.
///
/// Unterminated markers are closed at the end of the input.
///
/// # Examples
///
/// ```
/// use escape_core::{render_inline_markup, Context, TrustTag};
///
/// let notes = render_inline_markup("**Due** *today* <script>alert(1)</script>");
///
/// assert_eq!(notes.trust(), TrustTag::SanitizedFor(Context::HtmlBody));
/// assert_eq!(
///     notes.sanitized_str(),
///     Some("<b>Due</b> <i>today</i> &lt;script&gt;alert(1)&lt;/script&gt;")
/// );
/// ```
pub fn render_inline_markup(raw: &str) -> TrustedString {
    let markup = markers_to_tags(raw);
    let allow = AllowList::new().tags(["b", "i", "code", "br"]);

    TrustedString::sanitized(
        RichContentDocument::parse(&markup, &allow).to_html(),
        Context::HtmlBody,
    )
}

fn markers_to_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    let mut text = String::new();
    let mut bold = false;
    let mut italic = false;
    let mut code = false;

    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        let tag = match c {
            '`' => {
                code = !code;
                Some(if code { "<code>" } else { "</code>" })
            }
            '*' if !code && chars.peek() == Some(&'*') => {
                chars.next();
                bold = !bold;
                Some(if bold { "<b>" } else { "</b>" })
            }
            '*' if !code => {
                italic = !italic;
                Some(if italic { "<i>" } else { "</i>" })
            }
            '\n' => Some("<br>"),
            '\r' => Some(""),
            _ => None,
        };

        match tag {
            Some(tag) => {
                push_html_escaped(&mut out, &text);
                text.clear();
                out.push_str(tag);
            }
            None => text.push(c),
        }
    }
    push_html_escaped(&mut out, &text);

    out
}

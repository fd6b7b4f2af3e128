//! Shared proptest strategies.

use proptest::prelude::*;

use crate::context::Context;

/// Characters that terminate or open a construct in at least one context.
const BREAKOUT_CHARS: [char; 16] = [
    '<', '>', '"', '\'', '&', '\\', '/', '`', ';', ':', '=', '%', '\n', '\u{0}', '\u{2028}',
    '\u{2029}',
];

/// Arbitrary text of up to `max` characters, biased towards characters that
/// are significant in HTML, URLs, JavaScript and CSS.
pub(crate) fn arb_text(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            3 => any::<char>(),
            2 => prop::sample::select(BREAKOUT_CHARS.to_vec()),
            1 => prop::char::range('a', 'z'),
        ],
        0..=max,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Any concrete context.
pub(crate) fn arb_context() -> impl Strategy<Value = Context> {
    prop::sample::select(Context::ALL.to_vec())
}

/// HTML fragments assembled from known injection payloads, benign markup
/// and broken tags.
pub(crate) fn arb_html_fragment() -> impl Strategy<Value = String> {
    const PIECES: [&str; 22] = [
        "<script>alert(1)</script>",
        "<img src=x onerror=alert(1)>",
        "<a href=\"javascript:alert(1)\">x</a>",
        "<a href=\" JaVaScRiPt:alert(1)\">y</a>",
        "<b>",
        "</b>",
        "<svg onload=alert(1)>",
        "<scr<script>ipt>",
        "<!--",
        "-->",
        "text",
        "&lt;",
        "<i>",
        "<a href=\"/ok\">",
        "</a>",
        "\"",
        "'",
        "<p>",
        "<style>x</style>",
        "<iframe src=javascript:alert(1)>",
        "<b onclick=\"alert(1)\">",
        "<img src=\"data:text/html,<script>alert(1)</script>\">",
    ];

    prop::collection::vec(prop::sample::select(PIECES.to_vec()), 0..12)
        .prop_map(|pieces| pieces.concat())
}

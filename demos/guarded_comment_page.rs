//! Guarded comment page demonstration.
//!
//! Renders a feedback-board page from hostile request data:
//! 1. Load sink registrations and policies from configuration
//! 2. Extract request metadata and untrusted inputs
//! 3. Parse the posted comment into a typed schema
//! 4. Render every value through the sink guard
//! 5. Show what the guard refused
//!
//! Run with: `RUST_LOG=sink_guard=debug cargo run --example guarded_comment_page`

use std::sync::Arc;

use escape_core::audit::AuditTrail;
use escape_core::web::{ExtractMetadata, ExtractTaintedInputs, RequestAdapter};
use escape_core::{
    builtin, HtmlDocument, Principal, RequestCtx, SanitizerConfig, SinkGuard, TrustedString,
};
use serde::Deserialize;

const CONFIG: &str = r#"{
    "builtin_sinks": true,
    "sinks": [
        {"descriptor": "comment.author", "context": "html_body"},
        {"descriptor": "comment.body", "context": "html_body"},
        {"descriptor": "comment.website", "context": "url_component", "navigable": true,
         "within": {"context": "html_attribute", "quote": "double"}}
    ],
    "policies": {
        "comment.body": {"mode": "allow_subset", "tags": ["b", "i", "code"], "attributes": []}
    }
}"#;

#[derive(Deserialize)]
struct NewComment {
    author: TrustedString,
    website: TrustedString,
    body: TrustedString,
}

/// Simulates a framework integration building the adapter
fn incoming_request() -> RequestAdapter {
    let mut adapter = RequestAdapter::new("req-00000001".to_string());
    adapter.set_principal(Some(Principal {
        id: "user-123".to_string(),
        name: TrustedString::untrusted("Alice <script>steal()</script>"),
    }));
    adapter.add_header("Cookie", "theme=dark\"><script>alert(1)</script>");
    adapter.add_query_string("sort=%3C%2Fscript%3E");
    adapter.set_body(
        b"author=%3Cimg+src%3Dx+onerror%3Dalert(1)%3E\
          &website=javascript%3Aalert(document.cookie)\
          &body=%3Cb%3EGreat%3C%2Fb%3E+post%21+%3Cscript%3Ealert(1)%3C%2Fscript%3E"
            .to_vec(),
    );
    adapter
}

fn handle_comment_post(
    adapter: &RequestAdapter,
    guard: SinkGuard,
) -> Result<String, Box<dyn std::error::Error>> {
    let ctx = RequestCtx::new(adapter.extract_metadata(), guard);
    let inputs = adapter.extract_tainted_inputs();
    let comment: NewComment = inputs.form_body()?;

    let theme = inputs
        .cookie("theme")
        .cloned()
        .unwrap_or_else(|| TrustedString::untrusted("light"));
    let sort = inputs
        .query_param("sort")
        .cloned()
        .unwrap_or_else(|| TrustedString::untrusted("new"));

    let page = HtmlDocument::new();
    page.literal("<body class=\"");
    ctx.render(&page.slot(builtin::HTML_ATTR), &theme)?;
    page.literal("\"><header>Signed in as ");
    if let Some(user) = ctx.principal() {
        ctx.render(&page.slot(builtin::HTML_TEXT), &user.name)?;
    }
    page.literal("</header><article><h3><a href=\"");
    ctx.render(&page.slot("comment.website"), &comment.website)?;
    page.literal("\">");
    ctx.render(&page.slot("comment.author"), &comment.author)?;
    page.literal("</a></h3><div>");
    ctx.render(&page.slot("comment.body"), &comment.body)?;
    page.literal("</div></article><script>const sort = '");
    ctx.render(&page.slot(builtin::JS_STRING), &sort)?;
    page.literal("';</script></body>");

    // The unescaped interpolation this page used to do is now a refused write.
    if let Err(error) = ctx.write(&page.slot(builtin::HTML_TEXT), &comment.body) {
        println!("Refused raw write: {error}");
    }

    Ok(page.into_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Guarded Comment Page ===\n");

    let (registry, policies) = SanitizerConfig::from_json_str(CONFIG)?.build()?;
    println!("Registered {} sinks, {} policies", registry.len(), policies.len());

    let trail = Arc::new(AuditTrail::new());
    let guard = SinkGuard::with_config(registry, policies).with_audit_trail(Arc::clone(&trail));

    let html = handle_comment_post(&incoming_request(), guard)?;
    println!("\nRendered page:\n{html}\n");

    println!("Guard decisions:");
    for event in trail.events() {
        println!("  {event}");
    }

    Ok(())
}

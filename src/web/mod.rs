//! Web framework integration surface.
//!
//! The boundary between HTTP frameworks and the escaping pipeline. It
//! handles:
//! - Mapping HTTP requests to [`RequestMeta`](crate::RequestMeta)
//! - Tagging every input untrusted at the boundary
//! - Parsing bodies into typed schemas whose string fields stay untrusted
//!
//! This module contains no framework-specific code. Nothing here escapes
//! or emits; that happens at render time through
//! [`RequestCtx`](crate::RequestCtx).
//!
//! # Example Flow
//!
//! ```
//! use escape_core::web::{ExtractMetadata, ExtractTaintedInputs, RequestAdapter};
//! use escape_core::{builtin, HtmlDocument, RequestCtx, SinkGuard, SinkRegistry, TrustedString};
//!
//! // 1. Built by a framework integration from its request type.
//! let mut adapter = RequestAdapter::new("req-9".to_string());
//! adapter.add_query_string("q=%3Cscript%3Ealert(1)%3C%2Fscript%3E");
//!
//! // 2. Split into metadata and untrusted inputs.
//! let ctx = RequestCtx::new(
//!     adapter.extract_metadata(),
//!     SinkGuard::new(SinkRegistry::with_builtin_sinks()),
//! );
//! let inputs = adapter.extract_tainted_inputs();
//!
//! // 3. Escape at the sink.
//! let page = HtmlDocument::new();
//! page.literal("<p>Results for ");
//! let q = inputs.query_param("q").cloned().unwrap_or_else(|| TrustedString::untrusted(""));
//! ctx.render(&page.slot(builtin::HTML_TEXT), &q).unwrap();
//! page.literal("</p>");
//!
//! assert_eq!(
//!     page.into_string(),
//!     "<p>Results for &lt;script&gt;alert(1)&lt;/script&gt;</p>"
//! );
//! ```

mod adapter;
mod body;
mod extract;

pub use adapter::{RequestAdapter, TaintedInputs};
pub use body::{parse_form_body, parse_json_body};
pub use extract::{ExtractMetadata, ExtractTaintedInputs};

//! Context-aware output escaping with sink enforcement.
//!
//! Untrusted text enters as a [`TrustedString`] tagged
//! [`TrustTag::Untrusted`]. The only way to obtain a sanitized value is to
//! escape it for a specific [`Context`], and the only way to emit a value is
//! through a [`SinkGuard`], which refuses anything not sanitized for the
//! exact context its sink was registered with.
//!
//! # Core Types
//!
//! - [`TrustedString`]: text plus the trust tag the escaper gave it
//! - [`Context`]: where in the output a value lands
//! - [`escape`]: the escaper engine
//! - [`SinkRegistry`]: descriptor to context classification
//! - [`SinkGuard`]: the enforcement point in front of every [`Sink`]
//! - [`RequestCtx`]: per-request rendering with policies and audit metadata
//!
//! # Examples
//!
//! ```
//! use escape_core::{builtin, HtmlDocument, SinkGuard, SinkRegistry, TrustedString};
//! use escape_core::{Error, SanitizationPolicy};
//!
//! let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
//! let comment = TrustedString::untrusted("<script>alert(1)</script>");
//!
//! let page = HtmlDocument::new();
//! let slot = page.slot(builtin::HTML_TEXT);
//!
//! // Raw input is refused.
//! assert!(matches!(guard.write(&slot, &comment), Err(Error::TrustMismatch(_))));
//!
//! // Escaped input is emitted.
//! let escaped = guard
//!     .prepare(&builtin::HTML_TEXT.into(), &comment, &SanitizationPolicy::EscapeAll)
//!     .unwrap();
//! guard.write(&slot, &escaped).unwrap();
//! assert_eq!(page.into_string(), "&lt;script&gt;alert(1)&lt;/script&gt;");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod classify;
mod config;
mod context;
mod document;
mod error;
mod escape;
mod guard;
mod markup;
mod policy;
mod request;
mod rich;
mod sink;
mod trusted;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use classify::{builtin, SinkDescriptor, SinkRegistry, SinkSpec};
pub use config::SanitizerConfig;
pub use context::{Context, Quote, UrlKind};
pub use document::{DocumentSlot, HtmlDocument};
pub use error::{
    BodyError, ConfigError, Error, SanitizationError, SanitizationErrorKind, SinkError,
    SinkErrorKind, TrustMismatchError, UnknownSinkError,
};
pub use escape::{
    attribute_context, escape, escape_bytes, escape_json, escape_utf16, ContextSanitizer,
    Sanitizer, BLOCKED_URL_PLACEHOLDER,
};
pub use guard::SinkGuard;
pub use markup::render_inline_markup;
pub use policy::{AllowList, PolicySet, SanitizationPolicy, ALWAYS_DROPPED_TAGS, URL_ATTRIBUTES};
pub use request::{Principal, RequestCtx, RequestMeta};
pub use rich::RichContentDocument;
pub use sink::{BufferSink, Emission, Sink};
pub use trusted::{TrustTag, TrustedString};

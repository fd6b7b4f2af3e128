use crate::error::Error;
use crate::guard::SinkGuard;
use crate::sink::Sink;
use crate::trusted::TrustedString;

/// Metadata about an incoming request.
///
/// Contains the request identifier and optional principal (authenticated user/service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// Authenticated principal, if any
    pub principal: Option<Principal>,
}

/// An authenticated user or service principal.
///
/// The display name comes from user-controlled profile data and is wrapped
/// as untrusted; it must be escaped like any other input before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: TrustedString,
}

/// Everything a handler needs to render one response.
///
/// Passed explicitly through the handler instead of living in a global, so
/// concurrent requests never see each other's principal.
///
/// # Examples
///
/// ```
/// use escape_core::{
///     HtmlDocument, Principal, RequestCtx, RequestMeta, SinkGuard, SinkRegistry, TrustedString,
/// };
///
/// let meta = RequestMeta {
///     request_id: "req-7".to_string(),
///     principal: Some(Principal {
///         id: "u1".to_string(),
///         name: TrustedString::untrusted("<b>Eve</b>"),
///     }),
/// };
/// let ctx = RequestCtx::new(meta, SinkGuard::new(SinkRegistry::with_builtin_sinks()));
///
/// let page = HtmlDocument::new();
/// page.literal("<span>");
/// if let Some(user) = ctx.principal() {
///     ctx.render(&page.slot("html.text"), &user.name).unwrap();
/// }
/// page.literal("</span>");
///
/// assert_eq!(page.into_string(), "<span>&lt;b&gt;Eve&lt;/b&gt;</span>");
/// ```
#[derive(Debug, Clone)]
pub struct RequestCtx {
    meta: RequestMeta,
    guard: SinkGuard,
}

impl RequestCtx {
    /// Creates a context rendering through `guard` and its policies.
    pub fn new(meta: RequestMeta, guard: SinkGuard) -> Self {
        Self { meta, guard }
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.meta.request_id
    }

    /// Returns the principal if present.
    pub fn principal(&self) -> Option<&Principal> {
        self.meta.principal.as_ref()
    }

    /// Returns the request metadata.
    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Returns the guard.
    pub fn guard(&self) -> &SinkGuard {
        &self.guard
    }

    /// Escapes `value` for `sink` and writes it through the guard.
    ///
    /// The policy is the one the guard's current configuration names after
    /// the sink's descriptor, or `EscapeAll`. Runs inside a `render` span
    /// carrying the request ID.
    ///
    /// # Errors
    ///
    /// See [`SinkGuard::render`].
    pub fn render<S>(&self, sink: &S, value: &TrustedString) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        let span = tracing::debug_span!("render", request_id = %self.meta.request_id, sink = %sink.descriptor());
        let _entered = span.enter();

        self.guard
            .render_inner(sink, value, Some(&self.meta.request_id))
    }

    /// Writes an already sanitized value through the guard without
    /// escaping it.
    ///
    /// # Errors
    ///
    /// See [`SinkGuard::write`].
    pub fn write<S>(&self, sink: &S, value: &TrustedString) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        self.guard
            .write_inner(sink, value, Some(&self.meta.request_id))
    }
}

//! The single gate between sanitized values and sinks.

use std::sync::{Arc, PoisonError, RwLock};

use crate::audit::{AuditTrail, GuardAudit, GuardEvent, GuardOutcome};
use crate::classify::{SinkDescriptor, SinkRegistry};
use crate::context::Context;
use crate::error::{Error, TrustMismatchError, UnknownSinkError};
use crate::escape::escape;
use crate::policy::{PolicySet, SanitizationPolicy};
use crate::sink::{Emission, Sink};
use crate::trusted::{TrustTag, TrustedString};

/// Checks every write against the sink registry before the sink sees it.
///
/// A write succeeds only if the sink's descriptor is registered and the
/// value's trust tag equals the sink's required tag exactly. Untrusted
/// values, values sanitized for a different context and values for
/// unregistered sinks are refused before the sink is called.
///
/// `SinkGuard` is cheap to clone and can be shared across threads. The
/// registry can be replaced at runtime; writes in flight keep the snapshot
/// they started with.
///
/// # Examples
///
/// ```
/// use escape_core::{
///     BufferSink, Context, Error, SinkDescriptor, SinkGuard, SinkRegistry, TrustedString,
/// };
///
/// let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
/// let sink = BufferSink::new(SinkDescriptor::new("dom.inner_html"));
///
/// let raw = TrustedString::untrusted("<img src=x onerror=alert(1)>");
/// let result = guard.write(&sink, &raw);
///
/// assert!(matches!(result, Err(Error::TrustMismatch(_))));
/// assert!(sink.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SinkGuard {
    snapshot: Arc<RwLock<Arc<GuardSnapshot>>>,
    audit: GuardAudit,
}

/// One consistent view of the registry and the named policies.
///
/// Readers clone the outer `Arc`; a reload swaps the whole snapshot.
#[derive(Debug)]
struct GuardSnapshot {
    registry: Arc<SinkRegistry>,
    policies: Arc<PolicySet>,
}

impl SinkGuard {
    /// Creates a guard over `registry` with no named policies.
    pub fn new(registry: SinkRegistry) -> Self {
        Self::with_config(registry, PolicySet::new())
    }

    /// Creates a guard over `registry` that renders with `policies`.
    ///
    /// This is the pair returned by
    /// [`SanitizerConfig::build`](crate::SanitizerConfig::build).
    pub fn with_config(registry: SinkRegistry, policies: PolicySet) -> Self {
        let snapshot = GuardSnapshot {
            registry: Arc::new(registry),
            policies: Arc::new(policies),
        };
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            audit: GuardAudit::new(),
        }
    }

    /// Records every decision into `trail` in addition to logging it.
    pub fn with_audit_trail(mut self, trail: Arc<AuditTrail>) -> Self {
        self.audit = GuardAudit::with_trail(trail);
        self
    }

    fn snapshot(&self) -> Arc<GuardSnapshot> {
        let current = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    fn swap(&self, snapshot: GuardSnapshot) {
        let sinks = snapshot.registry.len();
        let policies = snapshot.policies.len();
        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(snapshot);
        drop(current);

        tracing::info!(target: "sink_guard", sinks, policies, "guard configuration replaced");
    }

    /// Returns the registry snapshot currently in effect.
    pub fn registry(&self) -> Arc<SinkRegistry> {
        Arc::clone(&self.snapshot().registry)
    }

    /// Returns the named policies currently in effect.
    pub fn policies(&self) -> Arc<PolicySet> {
        Arc::clone(&self.snapshot().policies)
    }

    /// Atomically swaps in a new registry, keeping the current policies.
    ///
    /// Every clone of this guard sees the new registry on its next write.
    pub fn replace_registry(&self, registry: SinkRegistry) {
        let policies = self.policies();
        self.swap(GuardSnapshot {
            registry: Arc::new(registry),
            policies,
        });
    }

    /// Atomically swaps in a new registry and policy set together.
    ///
    /// A render already in flight finishes with the pair it started with;
    /// no render ever mixes the old registry with the new policies.
    ///
    /// ```
    /// use escape_core::{SanitizerConfig, SinkGuard, SinkRegistry};
    ///
    /// let guard = SinkGuard::new(SinkRegistry::new());
    /// let (registry, policies) = SanitizerConfig::from_json_str(r#"{
    ///     "sinks": [{"descriptor": "task.notes", "context": "html_body"}],
    ///     "policies": {"task.notes": {"mode": "allow_subset", "tags": ["b"]}}
    /// }"#).unwrap().build().unwrap();
    ///
    /// guard.replace_config(registry, policies);
    /// assert_eq!(guard.registry().len(), 1);
    /// assert!(guard.policies().contains("task.notes"));
    /// ```
    pub fn replace_config(&self, registry: SinkRegistry, policies: PolicySet) {
        self.swap(GuardSnapshot {
            registry: Arc::new(registry),
            policies: Arc::new(policies),
        });
    }

    /// Returns the context `descriptor` renders into.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSinkError`] for unregistered descriptors.
    pub fn classify(&self, descriptor: &SinkDescriptor) -> Result<Context, UnknownSinkError> {
        self.registry().classify(descriptor)
    }

    /// Escapes `value` into exactly the form `descriptor` requires.
    ///
    /// Untrusted values are escaped for the sink's context under `policy`
    /// (and nested into the attribute for nested sinks). Values that already
    /// carry the required tag are returned unchanged, as is a value
    /// sanitized for a nested sink's inner context after nesting.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownSink`] if `descriptor` is not registered
    /// - [`Error::TrustMismatch`] if `value` is sanitized for an unrelated
    ///   context; it must be escaped again from its raw source
    ///
    /// ```
    /// use escape_core::{SanitizationPolicy, SinkDescriptor, SinkGuard, SinkRegistry, TrustedString};
    ///
    /// let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
    /// let href = SinkDescriptor::new("html.href");
    ///
    /// let avatar = TrustedString::untrusted("javascript:alert(1)");
    /// let prepared = guard.prepare(&href, &avatar, &SanitizationPolicy::EscapeAll).unwrap();
    /// assert_eq!(prepared.sanitized_str(), Some("about:blank"));
    /// ```
    pub fn prepare(
        &self,
        descriptor: &SinkDescriptor,
        value: &TrustedString,
        policy: &SanitizationPolicy,
    ) -> Result<TrustedString, Error> {
        prepare_in(&self.registry(), descriptor, value, policy)
    }

    /// Writes `value` to `sink` if its trust tag matches the sink.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownSink`] if the sink's descriptor is not registered
    /// - [`Error::TrustMismatch`] if the value is untrusted or sanitized for
    ///   another context
    /// - [`Error::Sink`] if the sink itself fails
    pub fn write<S>(&self, sink: &S, value: &TrustedString) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        self.write_inner(sink, value, None)
    }

    /// Prepares `value` with the policy named after the sink, then writes
    /// it. Both steps use the same configuration snapshot.
    ///
    /// # Errors
    ///
    /// See [`SinkGuard::prepare`] and [`SinkGuard::write`].
    pub fn render<S>(&self, sink: &S, value: &TrustedString) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        self.render_inner(sink, value, None)
    }

    pub(crate) fn render_inner<S>(
        &self,
        sink: &S,
        value: &TrustedString,
        request_id: Option<&str>,
    ) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        let snapshot = self.snapshot();
        let descriptor = sink.descriptor();
        let policy = snapshot.policies.policy(descriptor.as_str());

        let prepared = match prepare_in(&snapshot.registry, descriptor, value, policy) {
            Ok(prepared) => prepared,
            Err(Error::UnknownSink(error)) => {
                self.audit
                    .emit(self.event(descriptor, value, GuardOutcome::UnknownSink, request_id));
                return Err(error.into());
            }
            Err(Error::TrustMismatch(error)) => {
                self.audit.emit(
                    self.event(descriptor, value, GuardOutcome::TrustMismatch, request_id)
                        .with_expected(error.expected()),
                );
                return Err(error.into());
            }
            Err(error) => return Err(error),
        };
        self.write_in(&snapshot.registry, sink, &prepared, request_id)
    }

    pub(crate) fn write_inner<S>(
        &self,
        sink: &S,
        value: &TrustedString,
        request_id: Option<&str>,
    ) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        self.write_in(&self.registry(), sink, value, request_id)
    }

    fn event(
        &self,
        descriptor: &SinkDescriptor,
        value: &TrustedString,
        outcome: GuardOutcome,
        request_id: Option<&str>,
    ) -> GuardEvent {
        let event = GuardEvent::new(descriptor.clone(), outcome, value.trust(), value.len());
        match request_id {
            Some(id) => event.with_request_id(id),
            None => event,
        }
    }

    fn write_in<S>(
        &self,
        registry: &SinkRegistry,
        sink: &S,
        value: &TrustedString,
        request_id: Option<&str>,
    ) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        let descriptor = sink.descriptor();
        let event = |outcome| self.event(descriptor, value, outcome, request_id);

        let spec = match registry.spec(descriptor) {
            Ok(spec) => spec,
            Err(error) => {
                self.audit.emit(event(GuardOutcome::UnknownSink));
                return Err(error.into());
            }
        };

        let expected = spec.required_tag();
        if value.trust() != expected {
            self.audit
                .emit(event(GuardOutcome::TrustMismatch).with_expected(expected));
            return Err(
                TrustMismatchError::new(descriptor.clone(), expected, value.trust()).into(),
            );
        }

        if let Err(error) = sink.emit(Emission::new(value.expose_raw(), expected)) {
            self.audit
                .emit(event(GuardOutcome::SinkFailed).with_expected(expected));
            return Err(error.into());
        }

        self.audit
            .emit(event(GuardOutcome::Emitted).with_expected(expected));
        Ok(())
    }
}

fn prepare_in(
    registry: &SinkRegistry,
    descriptor: &SinkDescriptor,
    value: &TrustedString,
    policy: &SanitizationPolicy,
) -> Result<TrustedString, Error> {
    let spec = registry.spec(descriptor)?;
    let required = spec.required_tag();

    match (value.trust(), spec.inner()) {
        (found, _) if found == required => Ok(value.clone()),
        (TrustTag::Untrusted, None) => Ok(escape(value.expose_raw(), spec.context(), policy)?),
        (TrustTag::Untrusted, Some(inner)) => {
            Ok(escape(value.expose_raw(), inner, policy)?.nest(spec.context())?)
        }
        (TrustTag::SanitizedFor(found), Some(inner)) if found == inner => {
            Ok(value.clone().nest(spec.context())?)
        }
        (found, _) => Err(TrustMismatchError::new(descriptor.clone(), required, found).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::builtin;
    use crate::context::{Quote, UrlKind};
    use crate::error::SinkErrorKind;
    use crate::policy::AllowList;
    use crate::sink::BufferSink;

    fn sanitized(raw: &str, context: Context) -> TrustedString {
        escape(raw, context, &SanitizationPolicy::EscapeAll).unwrap()
    }

    fn guard_with_trail() -> (SinkGuard, Arc<AuditTrail>) {
        let trail = Arc::new(AuditTrail::new());
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks())
            .with_audit_trail(Arc::clone(&trail));
        (guard, trail)
    }

    #[test]
    fn matching_tag_is_emitted() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::new(builtin::HTML_TEXT.into());

        guard
            .write(&sink, &sanitized("<b>", Context::HtmlBody))
            .unwrap();

        assert_eq!(sink.contents(), "&lt;b&gt;");
        assert_eq!(trail.count(GuardOutcome::Emitted), 1);
    }

    #[test]
    fn untrusted_is_refused() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::new(builtin::HTML_TEXT.into());

        let error = guard
            .write(&sink, &TrustedString::untrusted("<script>"))
            .unwrap_err();

        match error {
            Error::TrustMismatch(mismatch) => {
                assert_eq!(mismatch.expected(), TrustTag::SanitizedFor(Context::HtmlBody));
                assert_eq!(mismatch.found(), TrustTag::Untrusted);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.is_empty());
        assert_eq!(trail.count(GuardOutcome::TrustMismatch), 1);
    }

    #[test]
    fn wrong_context_is_refused() {
        let (guard, _) = guard_with_trail();
        let sink = BufferSink::new(builtin::JS_STRING.into());

        let result = guard.write(&sink, &sanitized("x", Context::HtmlBody));

        assert!(matches!(result, Err(Error::TrustMismatch(_))));
        assert!(sink.is_empty());
    }

    #[test]
    fn attribute_quote_style_must_match() {
        let (guard, _) = guard_with_trail();
        let sink = BufferSink::new(builtin::HTML_ATTR_SINGLE.into());

        let double = sanitized("x", Context::HtmlAttribute(Quote::Double));
        assert!(guard.write(&sink, &double).is_err());

        let single = sanitized("x", Context::HtmlAttribute(Quote::Single));
        assert!(guard.write(&sink, &single).is_ok());
    }

    #[test]
    fn nested_sink_requires_nested_value() {
        let (guard, _) = guard_with_trail();
        let sink = BufferSink::new(builtin::HTML_HREF.into());
        let url = sanitized("/a?b=1&c=2", Context::UrlComponent(UrlKind::Navigable));

        assert!(guard.write(&sink, &url).is_err());

        let nested = url.nest(Context::HtmlAttribute(Quote::Double)).unwrap();
        guard.write(&sink, &nested).unwrap();
        assert_eq!(sink.contents(), "/a?b=1&amp;c=2");
    }

    #[test]
    fn unknown_sink_is_refused() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::new(SinkDescriptor::new("not.registered"));

        let result = guard.write(&sink, &sanitized("x", Context::HtmlBody));

        assert!(matches!(result, Err(Error::UnknownSink(_))));
        assert!(sink.is_empty());
        assert_eq!(trail.count(GuardOutcome::UnknownSink), 1);
        assert_eq!(trail.events()[0].expected(), None);
    }

    #[test]
    fn sink_failure_is_reported() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::with_capacity_limit(builtin::HTML_TEXT.into(), 0);

        let error = guard
            .write(&sink, &sanitized("x", Context::HtmlBody))
            .unwrap_err();

        assert!(matches!(error, Error::Sink(ref e) if e.kind() == SinkErrorKind::Full));
        assert_eq!(trail.count(GuardOutcome::SinkFailed), 1);
    }

    #[test]
    fn audit_never_holds_the_value() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::new(builtin::HTML_TEXT.into());

        let _ = guard.write(&sink, &TrustedString::untrusted("secret-payload"));

        let logged = trail.events()[0].to_string();
        assert!(!logged.contains("secret-payload"));
        assert!(logged.contains("len=14"));
    }

    #[test]
    fn replaced_registry_is_seen_by_clones() {
        let guard = SinkGuard::new(SinkRegistry::new());
        let clone = guard.clone();
        let sink = BufferSink::new(SinkDescriptor::new("late.sink"));
        let value = sanitized("x", Context::CssValue);

        assert!(clone.write(&sink, &value).is_err());

        let mut registry = SinkRegistry::new();
        registry.register_sink("late.sink", Context::CssValue).unwrap();
        guard.replace_registry(registry);

        clone.write(&sink, &value).unwrap();
        assert_eq!(clone.classify(&"late.sink".into()).unwrap(), Context::CssValue);
    }

    #[test]
    fn old_snapshot_survives_replacement() {
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
        let snapshot = guard.registry();

        guard.replace_registry(SinkRegistry::new());

        assert_eq!(snapshot.len(), 12);
        assert!(guard.registry().is_empty());
    }

    #[test]
    fn replace_config_swaps_policies_with_registry() {
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
        let value = TrustedString::untrusted("<b>x</b><script>y</script>");

        let text = BufferSink::new(builtin::HTML_TEXT.into());
        guard.render(&text, &value).unwrap();
        assert_eq!(text.contents(), "&lt;b&gt;x&lt;/b&gt;&lt;script&gt;y&lt;/script&gt;");

        let mut registry = SinkRegistry::new();
        registry.register_sink("task.notes", Context::HtmlBody).unwrap();
        let mut policies = PolicySet::new();
        policies.insert("task.notes", SanitizationPolicy::AllowSubset(AllowList::new().tag("b")));
        guard.replace_config(registry, policies);

        let notes = BufferSink::new("task.notes".into());
        guard.render(&notes, &value).unwrap();
        assert_eq!(notes.contents(), "<b>x</b>");
        assert!(matches!(guard.render(&text, &value), Err(Error::UnknownSink(_))));
    }

    #[test]
    fn replace_registry_keeps_policies() {
        let mut policies = PolicySet::new();
        policies.insert("task.notes", SanitizationPolicy::AllowSubset(AllowList::new().tag("i")));
        let guard = SinkGuard::with_config(SinkRegistry::new(), policies);

        let mut registry = SinkRegistry::new();
        registry.register_sink("task.notes", Context::HtmlBody).unwrap();
        guard.replace_registry(registry);

        let sink = BufferSink::new("task.notes".into());
        guard.render(&sink, &TrustedString::untrusted("<i>a</i><u>b</u>")).unwrap();
        assert_eq!(sink.contents(), "<i>a</i>");
        assert!(guard.policies().contains("task.notes"));
    }

    #[test]
    fn render_audits_refusals_from_prepare() {
        let (guard, trail) = guard_with_trail();
        let sink = BufferSink::new(builtin::JS_STRING.into());

        let result = guard.render(&sink, &sanitized("x", Context::HtmlBody));
        assert!(matches!(result, Err(Error::TrustMismatch(_))));

        let missing = BufferSink::new(SinkDescriptor::new("not.registered"));
        assert!(guard.render(&missing, &TrustedString::untrusted("x")).is_err());

        assert_eq!(trail.count(GuardOutcome::TrustMismatch), 1);
        assert_eq!(trail.count(GuardOutcome::UnknownSink), 1);
        assert_eq!(
            trail.events()[0].expected(),
            Some(TrustTag::SanitizedFor(Context::JsStringLiteral))
        );
    }

    #[test]
    fn prepare_escapes_for_direct_and_nested_sinks() {
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
        let policy = SanitizationPolicy::EscapeAll;

        let text = guard
            .prepare(&builtin::HTML_TEXT.into(), &TrustedString::untrusted("<i>"), &policy)
            .unwrap();
        assert_eq!(text.sanitized_str(), Some("&lt;i&gt;"));

        let href = guard
            .prepare(&builtin::HTML_HREF.into(), &TrustedString::untrusted("/a?x=1&y=2"), &policy)
            .unwrap();
        assert_eq!(href.sanitized_str(), Some("/a?x=1&amp;y=2"));

        let url = sanitized("/p", Context::UrlComponent(UrlKind::Navigable));
        let href = guard.prepare(&builtin::HTML_HREF.into(), &url, &policy).unwrap();
        assert!(matches!(href.trust(), TrustTag::Nested { .. }));
    }

    #[test]
    fn prepare_is_idempotent() {
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());
        let policy = SanitizationPolicy::EscapeAll;
        let descriptor = SinkDescriptor::new(builtin::URL_QUERY);

        let once = guard
            .prepare(&descriptor, &TrustedString::untrusted("a&b"), &policy)
            .unwrap();
        let twice = guard.prepare(&descriptor, &once, &policy).unwrap();

        assert_eq!(twice, once);
        assert_eq!(twice.sanitized_str(), Some("a%26b"));
    }

    #[test]
    fn prepare_refuses_value_for_other_context() {
        let guard = SinkGuard::new(SinkRegistry::with_builtin_sinks());

        let error = guard
            .prepare(
                &builtin::JS_STRING.into(),
                &sanitized("x", Context::HtmlBody),
                &SanitizationPolicy::EscapeAll,
            )
            .unwrap_err();
        assert!(matches!(error, Error::TrustMismatch(_)));
    }

    #[test]
    fn guard_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SinkGuard>();
    }
}

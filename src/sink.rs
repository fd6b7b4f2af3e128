use std::cell::RefCell;

use crate::classify::SinkDescriptor;
use crate::error::{SinkError, SinkErrorKind};
use crate::trusted::TrustTag;

/// A value the [`SinkGuard`](crate::SinkGuard) has checked against a sink's
/// requirement.
///
/// Only the guard constructs `Emission`s, so a [`Sink`] implementation can
/// write `as_str()` to its destination without further checks.
#[derive(Debug, Clone, Copy)]
pub struct Emission<'a> {
    value: &'a str,
    trust: TrustTag,
}

impl<'a> Emission<'a> {
    // BREAKING CHANGE WARNING: This constructor MUST stay pub(crate).
    // A public constructor lets host code hand any string to a sink.
    pub(crate) fn new(value: &'a str, trust: TrustTag) -> Self {
        Self { value, trust }
    }

    /// The escaped text to write.
    pub fn as_str(&self) -> &'a str {
        self.value
    }

    /// The trust tag the value was checked against.
    pub fn trust(&self) -> TrustTag {
        self.trust
    }
}

/// An output destination: a response body, a header, a DOM property, a log.
///
/// Hosts implement `Sink` for their own destinations and write through a
/// [`SinkGuard`](crate::SinkGuard). `emit` receives only an [`Emission`],
/// which cannot be created outside this crate.
///
/// # Examples
///
/// ```
/// use escape_core::{
///     escape, BufferSink, Context, SanitizationPolicy, SinkDescriptor, SinkGuard, SinkRegistry,
/// };
///
/// let mut registry = SinkRegistry::new();
/// registry.register_sink("comment.body", Context::HtmlBody).unwrap();
/// let guard = SinkGuard::new(registry);
///
/// let sink = BufferSink::new(SinkDescriptor::new("comment.body"));
/// let value = escape("<b>", Context::HtmlBody, &SanitizationPolicy::EscapeAll).unwrap();
///
/// guard.write(&sink, &value).unwrap();
/// assert_eq!(sink.into_vec(), vec!["&lt;b&gt;"]);
/// ```
// BREAKING CHANGE WARNING: Do NOT add a method taking &str or &TrustedString.
// Every write MUST go through SinkGuard, which is the only producer of Emission.
pub trait Sink {
    /// The descriptor this sink is registered under.
    fn descriptor(&self) -> &SinkDescriptor;

    /// Writes a guard-approved value.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the destination fails (I/O error, capacity
    /// exceeded).
    fn emit(&self, emission: Emission<'_>) -> Result<(), SinkError>;
}

/// A sink that collects emitted strings in memory.
///
/// Stands in for client-side writes (`innerHTML`, `location`) and for tests.
///
/// # Examples
///
/// ```
/// use escape_core::{BufferSink, SinkDescriptor};
///
/// let sink = BufferSink::with_capacity_limit(SinkDescriptor::new("dom.inner_html"), 4);
/// assert!(sink.is_empty());
/// ```
#[derive(Debug)]
pub struct BufferSink {
    descriptor: SinkDescriptor,
    values: RefCell<Vec<String>>,
    limit: Option<usize>,
}

impl BufferSink {
    /// Creates an empty, unbounded sink.
    pub fn new(descriptor: SinkDescriptor) -> Self {
        Self {
            descriptor,
            values: RefCell::new(Vec::new()),
            limit: None,
        }
    }

    /// Creates a sink that accepts at most `limit` values.
    pub fn with_capacity_limit(descriptor: SinkDescriptor, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(descriptor)
        }
    }

    /// Returns the number of values in the sink.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Returns `true` if the sink contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Provides borrowed access to values via callback (zero-copy).
    pub fn with_values<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[String]) -> R,
    {
        f(&self.values.borrow())
    }

    /// Returns the concatenation of every emitted value, in order.
    pub fn contents(&self) -> String {
        self.values.borrow().concat()
    }

    /// Consumes the sink and returns the collected values.
    pub fn into_vec(self) -> Vec<String> {
        self.values.into_inner()
    }
}

impl Sink for BufferSink {
    fn descriptor(&self) -> &SinkDescriptor {
        &self.descriptor
    }

    fn emit(&self, emission: Emission<'_>) -> Result<(), SinkError> {
        let mut values = self.values.borrow_mut();
        if self.limit.is_some_and(|limit| values.len() >= limit) {
            return Err(SinkError::with_message(
                SinkErrorKind::Full,
                format!("'{}' holds its maximum of {} values", self.descriptor, values.len()),
            ));
        }

        values.push(emission.as_str().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn emission(value: &str) -> Emission<'_> {
        Emission::new(value, TrustTag::SanitizedFor(Context::HtmlBody))
    }

    #[test]
    fn buffer_sink_collects_in_order() {
        let sink = BufferSink::new(SinkDescriptor::new("dom.inner_html"));

        sink.emit(emission("a")).unwrap();
        sink.emit(emission("b")).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.contents(), "ab");
        sink.with_values(|values| assert_eq!(values, ["a", "b"]));
        assert_eq!(sink.into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn buffer_sink_reports_full() {
        let sink = BufferSink::with_capacity_limit(SinkDescriptor::new("log"), 1);

        sink.emit(emission("first")).unwrap();
        let error = sink.emit(emission("second")).unwrap_err();

        assert_eq!(error.kind(), SinkErrorKind::Full);
        assert!(!error.to_string().contains("second"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn emission_exposes_text_and_tag() {
        let emission = emission("&lt;");

        assert_eq!(emission.as_str(), "&lt;");
        assert_eq!(emission.trust(), TrustTag::SanitizedFor(Context::HtmlBody));
    }
}

//! Guard decision schema.

use std::fmt;

use crate::classify::SinkDescriptor;
use crate::trusted::TrustTag;

/// Outcome of one guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardOutcome {
    /// The value was handed to the sink.
    Emitted,
    /// The sink descriptor is not registered.
    UnknownSink,
    /// The value's trust tag does not match the sink.
    TrustMismatch,
    /// The guard accepted the value but the sink failed to write it.
    SinkFailed,
}

impl GuardOutcome {
    /// Returns `true` for outcomes where nothing reached the sink because
    /// the guard refused it.
    pub fn is_rejection(self) -> bool {
        matches!(self, GuardOutcome::UnknownSink | GuardOutcome::TrustMismatch)
    }
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardOutcome::Emitted => write!(f, "emitted"),
            GuardOutcome::UnknownSink => write!(f, "unknown_sink"),
            GuardOutcome::TrustMismatch => write!(f, "trust_mismatch"),
            GuardOutcome::SinkFailed => write!(f, "sink_failed"),
        }
    }
}

/// One guard decision, containing only safe metadata.
///
/// # Safety Invariants
///
/// - The written value is never stored, only its length
/// - Request identifiers come from [`RequestMeta`](crate::RequestMeta), never from input
///
/// # Example
///
/// ```
/// use escape_core::audit::{GuardEvent, GuardOutcome};
/// use escape_core::{Context, SinkDescriptor, TrustTag};
///
/// let event = GuardEvent::new(
///     SinkDescriptor::new("comment.body"),
///     GuardOutcome::TrustMismatch,
///     TrustTag::Untrusted,
///     42,
/// )
/// .with_expected(TrustTag::SanitizedFor(Context::HtmlBody))
/// .with_request_id("req-123");
///
/// assert_eq!(event.request_id(), Some("req-123"));
/// assert_eq!(
///     event.to_string(),
///     "sink=comment.body outcome=trust_mismatch expected=sanitized-for:html_body found=untrusted len=42"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardEvent {
    sink: SinkDescriptor,
    outcome: GuardOutcome,
    /// None when the sink is unknown
    expected: Option<TrustTag>,
    found: TrustTag,
    /// Length of the value in bytes (not the value)
    len: usize,
    request_id: Option<String>,
}

impl GuardEvent {
    /// Creates an event with the required fields.
    pub fn new(sink: SinkDescriptor, outcome: GuardOutcome, found: TrustTag, len: usize) -> Self {
        Self {
            sink,
            outcome,
            expected: None,
            found,
            len,
            request_id: None,
        }
    }

    /// Sets the trust tag the sink required.
    pub fn with_expected(mut self, expected: TrustTag) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Sets the request correlation identifier.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the sink descriptor.
    pub fn sink(&self) -> &SinkDescriptor {
        &self.sink
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> GuardOutcome {
        self.outcome
    }

    /// Returns the required trust tag, if the sink was known.
    pub fn expected(&self) -> Option<TrustTag> {
        self.expected
    }

    /// Returns the trust tag of the written value.
    pub fn found(&self) -> TrustTag {
        self.found
    }

    /// Returns the length in bytes of the value the write carried.
    pub fn value_len(&self) -> usize {
        self.len
    }

    /// Returns the request identifier, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl fmt::Display for GuardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(request_id) = &self.request_id {
            write!(f, "request_id={request_id} ")?;
        }
        write!(f, "sink={} outcome={}", self.sink, self.outcome)?;
        if let Some(expected) = self.expected {
            write!(f, " expected={expected}")?;
        }
        write!(f, " found={} len={}", self.found, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn rejection_outcomes() {
        assert!(GuardOutcome::UnknownSink.is_rejection());
        assert!(GuardOutcome::TrustMismatch.is_rejection());
        assert!(!GuardOutcome::Emitted.is_rejection());
        assert!(!GuardOutcome::SinkFailed.is_rejection());
    }

    #[test]
    fn display_omits_missing_fields() {
        let event = GuardEvent::new(
            SinkDescriptor::new("nope"),
            GuardOutcome::UnknownSink,
            TrustTag::SanitizedFor(Context::CssValue),
            3,
        );

        assert_eq!(
            event.to_string(),
            "sink=nope outcome=unknown_sink found=sanitized-for:css_value len=3"
        );
    }

    #[test]
    fn display_leads_with_request_id() {
        let event = GuardEvent::new(
            SinkDescriptor::new("html.text"),
            GuardOutcome::Emitted,
            TrustTag::SanitizedFor(Context::HtmlBody),
            0,
        )
        .with_request_id("req-9");

        assert!(event.to_string().starts_with("request_id=req-9 sink=html.text"));
        assert_eq!(event.value_len(), 0);
    }
}

//! Emits guard events through tracing.

use std::sync::Arc;

use super::{AuditTrail, GuardEvent, GuardOutcome};

/// Emits [`GuardEvent`]s as structured `tracing` events under the
/// `sink_guard` target, and optionally records them in an [`AuditTrail`].
///
/// Emissions are logged at `debug`, everything else at `warn`.
#[derive(Debug, Clone, Default)]
pub struct GuardAudit {
    trail: Option<Arc<AuditTrail>>,
}

impl GuardAudit {
    /// An emitter that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// An emitter that logs and records into `trail`.
    pub fn with_trail(trail: Arc<AuditTrail>) -> Self {
        Self { trail: Some(trail) }
    }

    /// Returns the trail, if one is attached.
    pub fn trail(&self) -> Option<&Arc<AuditTrail>> {
        self.trail.as_ref()
    }

    /// Logs `event` and records it.
    pub fn emit(&self, event: GuardEvent) {
        let expected = event.expected().map(|tag| tag.to_string());

        match event.outcome() {
            GuardOutcome::Emitted => tracing::debug!(
                target: "sink_guard",
                request_id = ?event.request_id(),
                sink = %event.sink(),
                outcome = %event.outcome(),
                expected = ?expected,
                found = %event.found(),
                len = event.value_len(),
                "value emitted"
            ),
            _ => tracing::warn!(
                target: "sink_guard",
                request_id = ?event.request_id(),
                sink = %event.sink(),
                outcome = %event.outcome(),
                expected = ?expected,
                found = %event.found(),
                len = event.value_len(),
                "write refused"
            ),
        }

        if let Some(trail) = &self.trail {
            trail.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SinkDescriptor;
    use crate::trusted::TrustTag;

    #[test]
    fn emit_without_trail_does_not_panic() {
        GuardAudit::new().emit(GuardEvent::new(
            SinkDescriptor::new("a"),
            GuardOutcome::UnknownSink,
            TrustTag::Untrusted,
            0,
        ));
    }

    #[test]
    fn emit_records_into_trail() {
        let trail = Arc::new(AuditTrail::new());
        let audit = GuardAudit::with_trail(Arc::clone(&trail));

        audit.emit(GuardEvent::new(
            SinkDescriptor::new("a"),
            GuardOutcome::Emitted,
            TrustTag::Untrusted,
            5,
        ));

        assert_eq!(trail.len(), 1);
        assert_eq!(trail.events()[0].value_len(), 5);
        assert!(audit.trail().is_some());
    }
}

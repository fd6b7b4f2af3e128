//! In-memory audit trail recorder.

use std::sync::{Mutex, PoisonError};

use super::{GuardEvent, GuardOutcome};

/// In-memory recorder for guard events.
///
/// Shared between request threads behind an `Arc`; a
/// [`SinkGuard`](crate::SinkGuard) records into it when configured with
/// [`with_audit_trail`](crate::SinkGuard::with_audit_trail).
///
/// # Example
///
/// ```
/// use escape_core::audit::{AuditTrail, GuardEvent, GuardOutcome};
/// use escape_core::{SinkDescriptor, TrustTag};
///
/// let trail = AuditTrail::new();
/// trail.record(GuardEvent::new(
///     SinkDescriptor::new("comment.body"),
///     GuardOutcome::TrustMismatch,
///     TrustTag::Untrusted,
///     12,
/// ));
///
/// assert_eq!(trail.count(GuardOutcome::TrustMismatch), 1);
/// ```
#[derive(Debug, Default)]
pub struct AuditTrail {
    events: Mutex<Vec<GuardEvent>>,
}

impl AuditTrail {
    /// Creates a new empty audit trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event. Events are kept in the order they are recorded.
    pub fn record(&self, event: GuardEvent) {
        self.lock().push(event);
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<GuardEvent> {
        self.lock().clone()
    }

    /// Returns the number of recorded events with `outcome`.
    pub fn count(&self, outcome: GuardOutcome) -> usize {
        self.lock()
            .iter()
            .filter(|event| event.outcome() == outcome)
            .count()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while pushing cannot leave a half-written event behind.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GuardEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Audit records of sink guard decisions.
//!
//! This module provides:
//! - `GuardEvent`: what the guard decided for one write
//! - `GuardAudit`: emits events through `tracing` (target `sink_guard`)
//! - `AuditTrail`: in-memory recorder shared between threads
//!
//! Events carry the sink descriptor, the trust tags and the value length.
//! They never carry the value itself.

mod emit;
mod event;
mod trail;

pub use emit::GuardAudit;
pub use event::{GuardEvent, GuardOutcome};
pub use trail::AuditTrail;

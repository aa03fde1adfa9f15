//! Audit event types

use chrono::{DateTime, Utc};
use gigclock_api::EventKind;
use gigclock_util::{EventId, WorkerId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Attendance event persisted
    EventRecorded {
        worker_id: WorkerId,
        event_id: EventId,
        kind: EventKind,
    },

    /// Check-in/out refused
    TransitionDenied {
        worker_id: WorkerId,
        intent: EventKind,
        reason: String,
    },

    /// Verification attempt finished
    VerificationResolved { worker_id: WorkerId, success: bool },

    /// Worker abandoned the verification flow
    VerificationAbandoned { worker_id: WorkerId },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}

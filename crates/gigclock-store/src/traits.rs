//! Store trait definitions

use gigclock_api::AttendanceEvent;
use gigclock_util::{TimeRange, WorkerId};

use crate::{AuditEvent, StoreResult};

/// Main store trait
///
/// Appends must be atomic and visible to the next read; callers serialize
/// writes per worker.
pub trait Store: Send + Sync {
    // Attendance events

    /// Append an attendance event for a worker
    fn append_event(&self, worker: &WorkerId, event: &AttendanceEvent) -> StoreResult<()>;

    /// List a worker's events ordered by timestamp ascending, optionally
    /// restricted to a time range
    fn list_events(
        &self,
        worker: &WorkerId,
        range: Option<TimeRange>,
    ) -> StoreResult<Vec<AttendanceEvent>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

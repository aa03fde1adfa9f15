//! Attendance engine
//!
//! Ties one worker's state machine and verification gate to a site and an
//! event store, and answers history and statistics queries from the log.

use chrono::{DateTime, Utc};
use gigclock_api::{
    AttendanceEvent, Coordinate, DayGroup, Eligibility, EventKind, MonthStats, ReasonCode, Site,
    StatusFilter, WorkState,
};
use gigclock_store::{AuditEvent, AuditEventType, Store, StoreResult};
use gigclock_util::{DateRange, WorkerId, YearMonth, local_date};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    CheckinMachine, GateError, TransitionContext, TransitionError, VerificationGate,
    VerificationState, filter_days, geofence, group_by_day, stats_for_month, today_events,
};

/// Whether a check-in/out could go ahead right now, with every blocking reason
pub fn evaluate_eligibility(
    current: Option<&Coordinate>,
    site: &Site,
    gate: &VerificationGate,
    verification_required: bool,
) -> Eligibility {
    let mut reasons = Vec::new();

    let distance_meters = match current {
        Some(position) => {
            let fence = geofence::check(position, site);
            if !fence.within_range {
                reasons.push(ReasonCode::OutOfRange {
                    distance_meters: fence.distance_meters(),
                    allowed_radius_meters: site.allowed_radius_meters,
                });
            }
            Some(fence.distance_meters())
        }
        None => {
            reasons.push(ReasonCode::LocationUnavailable);
            None
        }
    };

    if !gate.is_satisfied(verification_required) {
        reasons.push(ReasonCode::VerificationRequired);
    }

    Eligibility {
        eligible: reasons.is_empty(),
        distance_meters,
        reasons,
    }
}

/// Snapshot of a worker's day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub worker_id: WorkerId,
    pub state: WorkState,
    pub next_intent: Option<EventKind>,
    pub verification: VerificationState,
    pub today: Vec<AttendanceEvent>,
}

/// The attendance engine for a single worker at a single site
pub struct AttendanceEngine {
    worker: WorkerId,
    store: Arc<dyn Store>,
    site: Site,
    verification_required: bool,
    machine: CheckinMachine,
    gate: VerificationGate,
}

impl AttendanceEngine {
    /// Create an engine, restoring today's state from the store
    pub fn new(
        worker: WorkerId,
        store: Arc<dyn Store>,
        site: Site,
        verification_required: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Self> {
        let today = DateRange::day(local_date(&now));
        let events = store.list_events(&worker, Some(today.to_time_range()))?;
        let machine = CheckinMachine::from_events(&events, now);

        info!(
            worker = %worker,
            site = %site.id,
            state = %machine.state(now),
            verification_required,
            "Attendance engine initialized"
        );

        Ok(Self {
            worker,
            store,
            site,
            verification_required,
            machine,
            gate: VerificationGate::new(),
        })
    }

    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn verification_required(&self) -> bool {
        self.verification_required
    }

    pub fn state(&self, now: DateTime<Utc>) -> WorkState {
        self.machine.state(now)
    }

    pub fn next_intent(&self, now: DateTime<Utc>) -> Option<EventKind> {
        self.machine.next_intent(now)
    }

    pub fn verification_state(&self) -> VerificationState {
        self.gate.state()
    }

    /// Current state with today's events
    pub fn status(&self, now: DateTime<Utc>) -> StoreResult<EngineStatus> {
        Ok(EngineStatus {
            worker_id: self.worker.clone(),
            state: self.machine.state(now),
            next_intent: self.machine.next_intent(now),
            verification: self.gate.state(),
            today: self.today(now)?,
        })
    }

    /// Evaluate eligibility at the given position
    pub fn eligibility(&self, current: Option<&Coordinate>) -> Eligibility {
        evaluate_eligibility(current, &self.site, &self.gate, self.verification_required)
    }

    // Verification

    pub fn begin_verification(&mut self) -> Result<(), GateError> {
        self.gate.begin()?;
        debug!(worker = %self.worker, "Verification started");
        Ok(())
    }

    pub fn resolve_verification(
        &mut self,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<VerificationState, GateError> {
        let state = self.gate.resolve(success)?;
        info!(worker = %self.worker, success, "Verification resolved");
        self.audit(
            AuditEventType::VerificationResolved {
                worker_id: self.worker.clone(),
                success,
            },
            now,
        );
        Ok(state)
    }

    /// Drop any attempt or unused outcome
    pub fn abandon_verification(&mut self, now: DateTime<Utc>) {
        if self.gate.state() == VerificationState::Idle {
            return;
        }
        self.gate.reset();
        debug!(worker = %self.worker, "Verification abandoned");
        self.audit(
            AuditEventType::VerificationAbandoned {
                worker_id: self.worker.clone(),
            },
            now,
        );
    }

    // Transitions

    /// Request a check-in or check-out at `current`
    pub fn transition(
        &mut self,
        intent: EventKind,
        current: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<AttendanceEvent, TransitionError> {
        let ctx = TransitionContext {
            worker: &self.worker,
            site: &self.site,
            current_location: current,
            verification_required: self.verification_required,
            now,
        };

        match self
            .machine
            .request_transition(intent, &ctx, &mut self.gate, self.store.as_ref())
        {
            Ok(event) => {
                info!(
                    worker = %self.worker,
                    kind = %event.kind,
                    status = %event.status,
                    distance_meters = event.distance_meters,
                    verified = event.verified,
                    "Attendance recorded"
                );
                self.audit(
                    AuditEventType::EventRecorded {
                        worker_id: self.worker.clone(),
                        event_id: event.id.clone(),
                        kind: event.kind,
                    },
                    now,
                );
                Ok(event)
            }
            Err(TransitionError::Store(e)) => {
                warn!(worker = %self.worker, intent = %intent, error = %e, "Failed to persist attendance event");
                Err(TransitionError::Store(e))
            }
            Err(e) => {
                debug!(worker = %self.worker, intent = %intent, reason = %e, "Transition denied");
                self.audit(
                    AuditEventType::TransitionDenied {
                        worker_id: self.worker.clone(),
                        intent,
                        reason: e.to_string(),
                    },
                    now,
                );
                Err(e)
            }
        }
    }

    pub fn check_in(
        &mut self,
        current: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<AttendanceEvent, TransitionError> {
        self.transition(EventKind::CheckIn, current, now)
    }

    pub fn check_out(
        &mut self,
        current: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<AttendanceEvent, TransitionError> {
        self.transition(EventKind::CheckOut, current, now)
    }

    // Queries

    /// Events on the local date of `now`
    pub fn today(&self, now: DateTime<Utc>) -> StoreResult<Vec<AttendanceEvent>> {
        let range = DateRange::day(local_date(&now));
        let events = self.store.list_events(&self.worker, Some(range.to_time_range()))?;
        Ok(today_events(&events, now))
    }

    /// Day groups in `range`, newest first, keeping days with a matching event
    pub fn day_groups(&self, range: DateRange, filter: StatusFilter) -> StoreResult<Vec<DayGroup>> {
        let events = self.store.list_events(&self.worker, Some(range.to_time_range()))?;
        Ok(filter_days(group_by_day(&events, range), filter))
    }

    pub fn month_stats(&self, month: YearMonth) -> StoreResult<MonthStats> {
        let events = self
            .store
            .list_events(&self.worker, Some(month.date_range().to_time_range()))?;
        Ok(stats_for_month(&events, month))
    }

    fn audit(&self, event: AuditEventType, now: DateTime<Utc>) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event, now)) {
            warn!(error = %e, "Failed to write audit entry");
        }
    }
}

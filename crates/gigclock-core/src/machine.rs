//! Daily check-in state machine

use chrono::{DateTime, Local, NaiveDate, Utc};
use gigclock_api::{
    AttendanceEvent, Coordinate, EventKind, EventStatus, ReasonCode, ShiftSchedule, Site,
    WorkState,
};
use gigclock_store::{Store, StoreError};
use gigclock_util::{EventId, WorkerId, local_date};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geofence;
use crate::verification::VerificationGate;

/// Why a transition was refused
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Cannot {intent} while {from}")]
    IllegalTransition { from: WorkState, intent: EventKind },

    #[error("Attendance for today is already complete")]
    TerminalState,

    #[error("Out of range: {distance_meters}m from the site, allowed within {allowed_radius_meters}m")]
    OutOfRange {
        distance_meters: f64,
        allowed_radius_meters: f64,
    },

    #[error("Identity verification required")]
    VerificationRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransitionError {
    /// Reason code for refusals the worker can resolve by moving or verifying
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            TransitionError::OutOfRange {
                distance_meters,
                allowed_radius_meters,
            } => Some(ReasonCode::OutOfRange {
                distance_meters: *distance_meters,
                allowed_radius_meters: *allowed_radius_meters,
            }),
            TransitionError::VerificationRequired => Some(ReasonCode::VerificationRequired),
            _ => None,
        }
    }
}

/// Inputs to a single transition request
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub worker: &'a WorkerId,
    /// Site the worker is checking in at, including its shift thresholds
    pub site: &'a Site,
    pub current_location: Coordinate,
    pub verification_required: bool,
    pub now: DateTime<Utc>,
}

/// Punctuality of an event against the shift thresholds
pub fn classify_status(kind: EventKind, at: DateTime<Utc>, schedule: &ShiftSchedule) -> EventStatus {
    let time = at.with_timezone(&Local).time();
    match kind {
        EventKind::CheckIn => match schedule.shift_start {
            Some(start) if time > start.to_naive_time() => EventStatus::Late,
            _ => EventStatus::Normal,
        },
        EventKind::CheckOut => match schedule.shift_end {
            Some(end) if time < end.to_naive_time() => EventStatus::Early,
            _ => EventStatus::Normal,
        },
    }
}

/// Per-worker attendance state for the current local day.
///
/// The stored state belongs to `day`; once the local date moves past it
/// the machine reads as `NotStarted` again. A clock that steps back to an
/// earlier date keeps the stored state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinMachine {
    state: WorkState,
    day: Option<NaiveDate>,
}

impl CheckinMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild today's state from a worker's event log
    pub fn from_events(events: &[AttendanceEvent], now: DateTime<Utc>) -> Self {
        let today = local_date(&now);
        let todays = || events.iter().filter(|e| e.local_date() == today);
        let checked_in = todays().any(|e| e.kind == EventKind::CheckIn);
        let checked_out = todays().any(|e| e.kind == EventKind::CheckOut);

        let state = match (checked_in, checked_out) {
            (false, _) => WorkState::NotStarted,
            (true, false) => WorkState::CheckedIn,
            (true, true) => WorkState::CheckedOut,
        };

        Self {
            state,
            day: Some(today),
        }
    }

    /// State as of `now`, applying the day-boundary reset
    pub fn state(&self, now: DateTime<Utc>) -> WorkState {
        match self.day {
            Some(day) if local_date(&now) <= day => self.state,
            _ => WorkState::NotStarted,
        }
    }

    /// The only transition currently allowed, if any
    pub fn next_intent(&self, now: DateTime<Utc>) -> Option<EventKind> {
        match self.state(now) {
            WorkState::NotStarted => Some(EventKind::CheckIn),
            WorkState::CheckedIn => Some(EventKind::CheckOut),
            WorkState::CheckedOut => None,
        }
    }

    fn check_legal(&self, intent: EventKind, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match (self.state(now), intent) {
            (WorkState::NotStarted, EventKind::CheckIn)
            | (WorkState::CheckedIn, EventKind::CheckOut) => Ok(()),
            (WorkState::CheckedOut, _) => Err(TransitionError::TerminalState),
            (from, intent) => Err(TransitionError::IllegalTransition { from, intent }),
        }
    }

    /// Attempt a check-in or check-out.
    ///
    /// Checks run in order: legality, geofence, verification. On success the
    /// event is appended to `store` before the state advances and before the
    /// gate's outcome is consumed; a failed append leaves both untouched.
    pub fn request_transition(
        &mut self,
        intent: EventKind,
        ctx: &TransitionContext<'_>,
        gate: &mut VerificationGate,
        store: &dyn Store,
    ) -> Result<AttendanceEvent, TransitionError> {
        self.check_legal(intent, ctx.now)?;

        let fence = geofence::check(&ctx.current_location, ctx.site);
        if !fence.within_range {
            return Err(TransitionError::OutOfRange {
                distance_meters: fence.distance_meters(),
                allowed_radius_meters: ctx.site.allowed_radius_meters,
            });
        }

        if !gate.is_satisfied(ctx.verification_required) {
            return Err(TransitionError::VerificationRequired);
        }

        let event = AttendanceEvent {
            id: EventId::new(),
            kind: intent,
            timestamp: ctx.now,
            coordinate: ctx.current_location,
            distance_meters: fence.distance_meters(),
            verified: gate.is_satisfied(true),
            status: classify_status(intent, ctx.now, &ctx.site.schedule),
        };

        store.append_event(ctx.worker, &event)?;

        gate.consume();
        self.state = match intent {
            EventKind::CheckIn => WorkState::CheckedIn,
            EventKind::CheckOut => WorkState::CheckedOut,
        };
        self.day = self.day.max(Some(local_date(&ctx.now)));

        debug!(
            worker = %ctx.worker,
            kind = %intent,
            status = %event.status,
            state = %self.state,
            "Transition committed"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::VerificationState;
    use chrono::TimeZone;
    use gigclock_store::{AuditEvent, SqliteStore, StoreResult};
    use gigclock_util::{SiteId, TimeRange, WallClock};

    struct FailingStore;

    impl Store for FailingStore {
        fn append_event(&self, _: &WorkerId, _: &AttendanceEvent) -> StoreResult<()> {
            Err(StoreError::Database("disk full".into()))
        }
        fn list_events(&self, _: &WorkerId, _: Option<TimeRange>) -> StoreResult<Vec<AttendanceEvent>> {
            Ok(vec![])
        }
        fn append_audit(&self, _: AuditEvent) -> StoreResult<()> {
            Ok(())
        }
        fn get_recent_audits(&self, _: usize) -> StoreResult<Vec<AuditEvent>> {
            Ok(vec![])
        }
        fn is_healthy(&self) -> bool {
            false
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 3, day, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn site() -> Site {
        Site::new(
            SiteId::new("hq"),
            "HQ",
            Coordinate::new(39.908823, 116.397470).unwrap(),
            100.0,
        )
        .unwrap()
        .with_schedule(ShiftSchedule {
            shift_start: WallClock::new(9, 0),
            shift_end: WallClock::new(18, 0),
        })
    }

    fn far_away() -> Coordinate {
        Coordinate::new(39.908823 + 0.0045, 116.397470).unwrap()
    }

    fn ctx<'a>(worker: &'a WorkerId, site: &'a Site, now: DateTime<Utc>) -> TransitionContext<'a> {
        TransitionContext {
            worker,
            site,
            current_location: site.coordinate,
            verification_required: false,
            now,
        }
    }

    #[test]
    fn test_full_day() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        let checkin = machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(4, 8, 55)), &mut gate, &store)
            .unwrap();
        assert_eq!(checkin.status, EventStatus::Normal);
        assert_eq!(checkin.distance_meters, 0.0);
        assert!(!checkin.verified);
        assert_eq!(machine.state(at(4, 12, 0)), WorkState::CheckedIn);
        assert_eq!(machine.next_intent(at(4, 12, 0)), Some(EventKind::CheckOut));

        let checkout = machine
            .request_transition(EventKind::CheckOut, &ctx(&worker, &site, at(4, 18, 5)), &mut gate, &store)
            .unwrap();
        assert_eq!(checkout.status, EventStatus::Normal);
        assert_eq!(machine.state(at(4, 20, 0)), WorkState::CheckedOut);
        assert_eq!(machine.next_intent(at(4, 20, 0)), None);

        assert_eq!(store.list_events(&worker, None).unwrap(), vec![checkin, checkout]);
    }

    #[test]
    fn test_checkout_before_checkin_is_illegal() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        let err = machine
            .request_transition(EventKind::CheckOut, &ctx(&worker, &site, at(4, 9, 0)), &mut gate, &store)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::IllegalTransition {
                from: WorkState::NotStarted,
                intent: EventKind::CheckOut
            }
        ));
        assert!(store.list_events(&worker, None).unwrap().is_empty());
    }

    #[test]
    fn test_double_checkin_is_illegal() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(4, 9, 0)), &mut gate, &store)
            .unwrap();
        let err = machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(4, 9, 1)), &mut gate, &store)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::IllegalTransition {
                from: WorkState::CheckedIn,
                intent: EventKind::CheckIn
            }
        ));
        assert_eq!(store.list_events(&worker, None).unwrap().len(), 1);
    }

    #[test]
    fn test_checked_out_is_terminal_until_next_day() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        for (kind, time) in [(EventKind::CheckIn, at(4, 9, 0)), (EventKind::CheckOut, at(4, 18, 0))] {
            machine
                .request_transition(kind, &ctx(&worker, &site, time), &mut gate, &store)
                .unwrap();
        }

        for kind in [EventKind::CheckIn, EventKind::CheckOut] {
            let err = machine
                .request_transition(kind, &ctx(&worker, &site, at(4, 19, 0)), &mut gate, &store)
                .unwrap_err();
            assert!(matches!(err, TransitionError::TerminalState));
        }

        // Next local day starts fresh
        assert_eq!(machine.state(at(5, 0, 0)), WorkState::NotStarted);
        machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(5, 8, 30)), &mut gate, &store)
            .unwrap();
        assert_eq!(machine.state(at(5, 9, 0)), WorkState::CheckedIn);
    }

    #[test]
    fn test_clock_stepping_back_keeps_state() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(5, 9, 0)), &mut gate, &store)
            .unwrap();
        assert_eq!(machine.state(at(4, 23, 0)), WorkState::CheckedIn);

        let err = machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(4, 23, 0)), &mut gate, &store)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::IllegalTransition {
                from: WorkState::CheckedIn,
                intent: EventKind::CheckIn
            }
        ));
        assert_eq!(store.list_events(&worker, None).unwrap().len(), 1);

        // A check-out under the stepped-back clock does not rewind the day
        machine
            .request_transition(EventKind::CheckOut, &ctx(&worker, &site, at(4, 23, 30)), &mut gate, &store)
            .unwrap();
        assert_eq!(machine.state(at(5, 12, 0)), WorkState::CheckedOut);
        assert_eq!(machine.state(at(6, 8, 0)), WorkState::NotStarted);
    }

    #[test]
    fn test_legality_checked_before_geofence() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        let mut context = ctx(&worker, &site, at(4, 9, 0));
        context.current_location = far_away();
        let err = machine
            .request_transition(EventKind::CheckOut, &context, &mut gate, &store)
            .unwrap_err();
        assert!(matches!(err, TransitionError::IllegalTransition { .. }));
    }

    #[test]
    fn test_out_of_range_is_refused() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        let mut context = ctx(&worker, &site, at(4, 9, 0));
        context.current_location = far_away();
        context.verification_required = true;
        let err = machine
            .request_transition(EventKind::CheckIn, &context, &mut gate, &store)
            .unwrap_err();

        match err {
            TransitionError::OutOfRange {
                distance_meters,
                allowed_radius_meters,
            } => {
                assert_eq!(distance_meters, 500.0);
                assert_eq!(allowed_radius_meters, 100.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(machine.state(at(4, 9, 0)), WorkState::NotStarted);
        assert!(store.list_events(&worker, None).unwrap().is_empty());
    }

    #[test]
    fn test_verification_required() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        let mut context = ctx(&worker, &site, at(4, 9, 0));
        context.verification_required = true;

        let err = machine
            .request_transition(EventKind::CheckIn, &context, &mut gate, &store)
            .unwrap_err();
        assert!(matches!(err, TransitionError::VerificationRequired));
        assert_eq!(err.reason_code(), Some(ReasonCode::VerificationRequired));

        gate.begin().unwrap();
        gate.resolve(false).unwrap();
        let err = machine
            .request_transition(EventKind::CheckIn, &context, &mut gate, &store)
            .unwrap_err();
        assert!(matches!(err, TransitionError::VerificationRequired));

        gate.begin().unwrap();
        gate.resolve(true).unwrap();
        let event = machine
            .request_transition(EventKind::CheckIn, &context, &mut gate, &store)
            .unwrap();
        assert!(event.verified);

        // The success was used up by the check-in
        assert_eq!(gate.state(), VerificationState::Idle);
        context.now = at(4, 18, 0);
        let err = machine
            .request_transition(EventKind::CheckOut, &context, &mut gate, &store)
            .unwrap_err();
        assert!(matches!(err, TransitionError::VerificationRequired));
    }

    #[test]
    fn test_failed_append_does_not_advance() {
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();
        gate.begin().unwrap();
        gate.resolve(true).unwrap();

        let mut context = ctx(&worker, &site, at(4, 9, 0));
        context.verification_required = true;
        let err = machine
            .request_transition(EventKind::CheckIn, &context, &mut gate, &FailingStore)
            .unwrap_err();

        assert!(matches!(err, TransitionError::Store(_)));
        assert_eq!(machine.state(at(4, 9, 0)), WorkState::NotStarted);
        assert_eq!(gate.state(), VerificationState::Succeeded);
    }

    #[test]
    fn test_classify_status() {
        let schedule = site().schedule;
        assert_eq!(classify_status(EventKind::CheckIn, at(4, 9, 0), &schedule), EventStatus::Normal);
        assert_eq!(classify_status(EventKind::CheckIn, at(4, 9, 5), &schedule), EventStatus::Late);
        assert_eq!(classify_status(EventKind::CheckOut, at(4, 17, 59), &schedule), EventStatus::Early);
        assert_eq!(classify_status(EventKind::CheckOut, at(4, 18, 0), &schedule), EventStatus::Normal);

        let open = ShiftSchedule::default();
        assert_eq!(classify_status(EventKind::CheckIn, at(4, 23, 0), &open), EventStatus::Normal);
        assert_eq!(classify_status(EventKind::CheckOut, at(4, 1, 0), &open), EventStatus::Normal);
    }

    #[test]
    fn test_from_events() {
        let store = SqliteStore::in_memory().unwrap();
        let worker = WorkerId::new("w1");
        let site = site();
        let mut machine = CheckinMachine::new();
        let mut gate = VerificationGate::new();

        machine
            .request_transition(EventKind::CheckIn, &ctx(&worker, &site, at(4, 9, 0)), &mut gate, &store)
            .unwrap();
        let events = store.list_events(&worker, None).unwrap();

        let restored = CheckinMachine::from_events(&events, at(4, 12, 0));
        assert_eq!(restored.state(at(4, 12, 0)), WorkState::CheckedIn);

        let tomorrow = CheckinMachine::from_events(&events, at(5, 8, 0));
        assert_eq!(tomorrow.state(at(5, 8, 0)), WorkState::NotStarted);
    }

    #[test]
    fn test_machine_serializes() {
        let machine = CheckinMachine::from_events(&[], at(4, 9, 0));
        let json = serde_json::to_string(&machine).unwrap();
        let parsed: CheckinMachine = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, machine);
    }
}

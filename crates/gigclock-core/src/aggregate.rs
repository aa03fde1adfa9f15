//! Day grouping and monthly statistics over the event log

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use gigclock_api::{AttendanceEvent, DayGroup, EventKind, EventStatus, MonthStats, StatusFilter};
use gigclock_util::{DateRange, YearMonth, local_date};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Invalid month {year}-{month}: month must be 1-12")]
    InvalidMonth { year: i32, month: u32 },
}

/// Round hours to one decimal place
pub fn round_hours(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

/// First check-in and first check-out of a day's events (ascending)
fn primary_events(events: &[AttendanceEvent]) -> (Option<&AttendanceEvent>, Option<&AttendanceEvent>) {
    let first_of = |kind: EventKind| events.iter().find(|e| e.kind == kind);
    (first_of(EventKind::CheckIn), first_of(EventKind::CheckOut))
}

/// Hours between the first check-in and first check-out, 0 if either is missing
fn worked_hours(check_in: Option<&AttendanceEvent>, check_out: Option<&AttendanceEvent>) -> f64 {
    match (check_in, check_out) {
        (Some(start), Some(end)) => {
            let seconds = (end.timestamp - start.timestamp).num_milliseconds() as f64 / 1000.0;
            round_hours((seconds / 3600.0).max(0.0))
        }
        _ => 0.0,
    }
}

fn day_status(events: &[AttendanceEvent]) -> EventStatus {
    if events.iter().any(|e| e.status == EventStatus::Late) {
        EventStatus::Late
    } else if events.iter().any(|e| e.status == EventStatus::Early) {
        EventStatus::Early
    } else {
        EventStatus::Normal
    }
}

/// Group events by local calendar date within `range`.
///
/// Groups are returned newest date first; events inside a group are
/// ascending by timestamp.
pub fn group_by_day(events: &[AttendanceEvent], range: DateRange) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<AttendanceEvent>> = BTreeMap::new();
    for event in events {
        let date = event.local_date();
        if range.contains(date) {
            days.entry(date).or_default().push(event.clone());
        }
    }

    days.into_iter()
        .rev()
        .map(|(date, mut events)| {
            events.sort_by_key(|e| e.timestamp);
            let (check_in, check_out) = primary_events(&events);
            let worked_hours = worked_hours(check_in, check_out);
            let day_status = day_status(&events);
            DayGroup {
                date,
                events,
                worked_hours,
                day_status,
            }
        })
        .collect()
}

/// Statistics for one calendar month
pub fn stats_for_month(events: &[AttendanceEvent], month: YearMonth) -> MonthStats {
    let mut stats = MonthStats::default();
    let mut total_hours = 0.0;

    for group in group_by_day(events, month.date_range()) {
        let (check_in, check_out) = primary_events(&group.events);
        if check_in.is_some() {
            stats.work_days += 1;
        }
        if check_in.is_some_and(|e| e.status == EventStatus::Late) {
            stats.late_count += 1;
        }
        if check_out.is_some_and(|e| e.status == EventStatus::Early) {
            stats.early_count += 1;
        }
        total_hours += group.worked_hours;
    }

    stats.total_hours = round_hours(total_hours);
    stats
}

/// Statistics for a month given as a year and a 1-based month number
pub fn month_stats(events: &[AttendanceEvent], year: i32, month: u32) -> Result<MonthStats, AggregateError> {
    let month = YearMonth::new(year, month).ok_or(AggregateError::InvalidMonth { year, month })?;
    Ok(stats_for_month(events, month))
}

/// Events whose status matches the filter, order preserved
pub fn filter_by_status(events: &[AttendanceEvent], filter: StatusFilter) -> Vec<AttendanceEvent> {
    events
        .iter()
        .filter(|e| filter.matches(e.status))
        .cloned()
        .collect()
}

/// Day groups that contain at least one event matching the filter.
///
/// Matching days keep all of their events so hours and day status stay intact.
pub fn filter_days(groups: Vec<DayGroup>, filter: StatusFilter) -> Vec<DayGroup> {
    groups
        .into_iter()
        .filter(|g| g.events.iter().any(|e| filter.matches(e.status)))
        .collect()
}

/// Events on the local date of `now`, ascending by timestamp
pub fn today_events(events: &[AttendanceEvent], now: DateTime<Utc>) -> Vec<AttendanceEvent> {
    let today = local_date(&now);
    let mut todays: Vec<AttendanceEvent> = events
        .iter()
        .filter(|e| e.local_date() == today)
        .cloned()
        .collect();
    todays.sort_by_key(|e| e.timestamp);
    todays
}

//! Shared types for gigclock

use chrono::{DateTime, NaiveDate, Utc};
use gigclock_util::{EventId, SiteId, WallClock, local_date};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default geofence radius around a site
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

/// Errors raised when constructing value types from untrusted input
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValueError {
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid radius {0}: must be a positive number of meters")]
    InvalidRadius(f64),

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// A validated WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValueError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValueError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValueError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Lateness and early-departure thresholds, in local wall-clock time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSchedule {
    /// Check-ins after this time are late
    pub shift_start: Option<WallClock>,
    /// Check-outs before this time are early
    pub shift_end: Option<WallClock>,
}

/// A work site with its geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSite")]
pub struct Site {
    pub id: SiteId,
    pub label: String,
    pub coordinate: Coordinate,
    pub allowed_radius_meters: f64,
    pub schedule: ShiftSchedule,
}

#[derive(Deserialize)]
struct RawSite {
    id: SiteId,
    label: String,
    coordinate: Coordinate,
    allowed_radius_meters: f64,
    #[serde(default)]
    schedule: ShiftSchedule,
}

impl TryFrom<RawSite> for Site {
    type Error = ValueError;

    fn try_from(raw: RawSite) -> Result<Self, Self::Error> {
        Ok(Site::new(raw.id, raw.label, raw.coordinate, raw.allowed_radius_meters)?
            .with_schedule(raw.schedule))
    }
}

impl Site {
    pub fn new(
        id: SiteId,
        label: impl Into<String>,
        coordinate: Coordinate,
        allowed_radius_meters: f64,
    ) -> Result<Self, ValueError> {
        if !allowed_radius_meters.is_finite() || allowed_radius_meters <= 0.0 {
            return Err(ValueError::InvalidRadius(allowed_radius_meters));
        }
        Ok(Self {
            id,
            label: label.into(),
            coordinate,
            allowed_radius_meters,
            schedule: ShiftSchedule::default(),
        })
    }

    pub fn with_schedule(mut self, schedule: ShiftSchedule) -> Self {
        self.schedule = schedule;
        self
    }
}

/// Kind of attendance event, also used as the transition intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckIn => "check_in",
            EventKind::CheckOut => "check_out",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in" => Ok(EventKind::CheckIn),
            "check_out" => Ok(EventKind::CheckOut),
            other => Err(ValueError::UnknownVariant {
                kind: "event kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Punctuality status of an event, or of a whole day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Normal,
    Late,
    Early,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Normal => "normal",
            EventStatus::Late => "late",
            EventStatus::Early => "early",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(EventStatus::Normal),
            "late" => Ok(EventStatus::Late),
            "early" => Ok(EventStatus::Early),
            other => Err(ValueError::UnknownVariant {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

/// A persisted check-in or check-out. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
    /// Distance to the site at the time of the event, rounded to the meter
    pub distance_meters: f64,
    pub verified: bool,
    pub status: EventStatus,
}

impl AttendanceEvent {
    /// Local calendar date this event belongs to
    pub fn local_date(&self) -> NaiveDate {
        local_date(&self.timestamp)
    }
}

/// A worker's attendance status for the current day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    #[default]
    NotStarted,
    CheckedIn,
    CheckedOut,
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkState::NotStarted => "not started",
            WorkState::CheckedIn => "working",
            WorkState::CheckedOut => "completed",
        })
    }
}

/// Events of one calendar date with derived hours and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    /// Events of the day, ascending by timestamp
    pub events: Vec<AttendanceEvent>,
    pub worked_hours: f64,
    pub day_status: EventStatus,
}

/// Monthly attendance summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthStats {
    pub work_days: u32,
    pub total_hours: f64,
    pub late_count: u32,
    pub early_count: u32,
}

/// Structured reasons why a check-in/out is not currently possible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasonCode {
    /// No position fix is available
    LocationUnavailable,
    /// Device is outside the site geofence
    OutOfRange {
        distance_meters: f64,
        allowed_radius_meters: f64,
    },
    /// Identity verification has not succeeded yet
    VerificationRequired,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonCode::LocationUnavailable => write!(f, "current location is unavailable"),
            ReasonCode::OutOfRange {
                distance_meters,
                allowed_radius_meters,
            } => write!(
                f,
                "{}m from the site, check-in allowed within {}m",
                distance_meters, allowed_radius_meters
            ),
            ReasonCode::VerificationRequired => write!(f, "identity verification required"),
        }
    }
}

/// Result of evaluating whether the worker may check in or out right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    /// Rounded distance to the site, if a position was available
    pub distance_meters: Option<f64>,
    pub reasons: Vec<ReasonCode>,
}

/// History filter on event status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Normal,
    Late,
    Early,
}

impl StatusFilter {
    pub fn matches(&self, status: EventStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Normal => status == EventStatus::Normal,
            StatusFilter::Late => status == EventStatus::Late,
            StatusFilter::Early => status == EventStatus::Early,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            other => other
                .parse::<EventStatus>()
                .map(|status| match status {
                    EventStatus::Normal => StatusFilter::Normal,
                    EventStatus::Late => StatusFilter::Late,
                    EventStatus::Early => StatusFilter::Early,
                })
                .map_err(|_| ValueError::UnknownVariant {
                    kind: "status filter",
                    value: other.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinate::new(39.908823, 116.397470).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(ValueError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn coordinate_deserialize_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 39.9, "longitude": 116.4}"#).unwrap();
        assert_eq!(ok.latitude(), 39.9);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 120.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn site_deserialize_validates_radius() {
        let ok: Site = serde_json::from_str(
            r#"{"id": "hq", "label": "HQ", "coordinate": {"latitude": 39.9, "longitude": 116.4},
                "allowed_radius_meters": 150.0}"#,
        )
        .unwrap();
        assert_eq!(ok.allowed_radius_meters, 150.0);
        assert_eq!(ok.schedule, ShiftSchedule::default());

        for radius in ["-5.0", "0.0"] {
            let json = format!(
                r#"{{"id": "hq", "label": "HQ", "coordinate": {{"latitude": 39.9, "longitude": 116.4}},
                    "allowed_radius_meters": {}}}"#,
                radius
            );
            let err = serde_json::from_str::<Site>(&json).unwrap_err();
            assert!(err.to_string().contains("Invalid radius"), "{}", err);
        }
    }

    #[test]
    fn site_rejects_bad_radius() {
        let coord = Coordinate::new(0.0, 0.0).unwrap();
        assert!(Site::new(SiteId::new("a"), "A", coord, DEFAULT_RADIUS_METERS).is_ok());
        assert_eq!(
            Site::new(SiteId::new("a"), "A", coord, 0.0),
            Err(ValueError::InvalidRadius(0.0))
        );
        assert!(Site::new(SiteId::new("a"), "A", coord, -5.0).is_err());
        assert!(Site::new(SiteId::new("a"), "A", coord, f64::INFINITY).is_err());
    }

    #[test]
    fn kind_and_status_strings() {
        for kind in [EventKind::CheckIn, EventKind::CheckOut] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        for status in [EventStatus::Normal, EventStatus::Late, EventStatus::Early] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("lunch".parse::<EventKind>().is_err());
    }

    #[test]
    fn status_filter_matches() {
        assert!(StatusFilter::All.matches(EventStatus::Late));
        assert!(StatusFilter::Late.matches(EventStatus::Late));
        assert!(!StatusFilter::Late.matches(EventStatus::Early));
        assert_eq!("early".parse::<StatusFilter>().unwrap(), StatusFilter::Early);
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("absent".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn reason_code_serializes_with_code_tag() {
        let reason = ReasonCode::OutOfRange {
            distance_meters: 500.0,
            allowed_radius_meters: 100.0,
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["code"], "out_of_range");
        assert_eq!(json["distance_meters"], 500.0);
    }
}

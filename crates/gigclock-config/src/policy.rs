//! Validated policy structures

use crate::schema::{RawConfig, RawSchedule, RawServiceConfig, RawSite};
use crate::validation::parse_time;
use gigclock_api::{Coordinate, DEFAULT_RADIUS_METERS, ShiftSchedule, Site};
use gigclock_util::{SiteId, WallClock, data_dir_without_env};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default wait for a position fix
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for a verification outcome
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated policy ready for use by the attendance engine
#[derive(Debug, Clone)]
pub struct Policy {
    /// Service configuration
    pub service: ServiceConfig,

    /// Whether every transition needs a successful verification
    pub verification_required: bool,

    /// Thresholds used by sites without their own schedule
    pub default_schedule: ShiftSchedule,

    /// Validated sites, each with its effective schedule
    pub sites: Vec<Site>,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let default_schedule = raw
            .schedule
            .as_ref()
            .map(|s| convert_schedule(s, &ShiftSchedule::default()))
            .unwrap_or_default();

        let sites = raw
            .sites
            .into_iter()
            .filter_map(|s| convert_site(s, &default_schedule))
            .collect();

        Self {
            service: ServiceConfig::from_raw(raw.service),
            verification_required: raw.verification.required,
            default_schedule,
            sites,
        }
    }

    /// Get site by ID
    pub fn get_site(&self, id: &SiteId) -> Option<&Site> {
        self.sites.iter().find(|s| &s.id == id)
    }

    /// Pick the site for a request: the explicit one, else the configured
    /// default, else the first site
    pub fn resolve_site(&self, requested: Option<&SiteId>) -> Option<&Site> {
        match requested.or(self.service.default_site.as_ref()) {
            Some(id) => self.get_site(id),
            None => self.sites.first(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub default_site: Option<SiteId>,
    pub location_timeout: Duration,
    pub verification_timeout: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            default_site: raw.default_site.map(SiteId::new),
            location_timeout: raw
                .location_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOCATION_TIMEOUT),
            verification_timeout: raw
                .verification_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_VERIFICATION_TIMEOUT),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

fn convert_site(raw: RawSite, default_schedule: &ShiftSchedule) -> Option<Site> {
    let schedule = raw
        .schedule
        .as_ref()
        .map(|s| convert_schedule(s, default_schedule))
        .unwrap_or(*default_schedule);

    let built = Coordinate::new(raw.latitude, raw.longitude).and_then(|coordinate| {
        Site::new(
            SiteId::new(raw.id.clone()),
            raw.label,
            coordinate,
            raw.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
        )
    });

    match built {
        Ok(site) => Some(site.with_schedule(schedule)),
        Err(e) => {
            warn!(site_id = %raw.id, error = %e, "Skipping invalid site");
            None
        }
    }
}

/// Fields missing from `raw` are inherited from `inherited`
fn convert_schedule(raw: &RawSchedule, inherited: &ShiftSchedule) -> ShiftSchedule {
    ShiftSchedule {
        shift_start: raw
            .shift_start
            .as_deref()
            .and_then(to_wall_clock)
            .or(inherited.shift_start),
        shift_end: raw
            .shift_end
            .as_deref()
            .and_then(to_wall_clock)
            .or(inherited.shift_end),
    }
}

fn to_wall_clock(s: &str) -> Option<WallClock> {
    parse_time(s).ok().and_then(|(h, m)| WallClock::new(h, m))
}

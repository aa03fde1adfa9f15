//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Identity verification policy
    #[serde(default)]
    pub verification: RawVerification,

    /// Default shift thresholds (can be overridden per site)
    #[serde(default)]
    pub schedule: Option<RawSchedule>,

    /// Registered work sites
    #[serde(default)]
    pub sites: Vec<RawSite>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the attendance database
    pub data_dir: Option<PathBuf>,

    /// Site used when none is given on the command line
    pub default_site: Option<String>,

    /// How long to wait for a position fix
    pub location_timeout_seconds: Option<u64>,

    /// How long to wait for a verification outcome
    pub verification_timeout_seconds: Option<u64>,
}

/// Verification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVerification {
    /// Require a successful verification before every check-in/out
    #[serde(default)]
    pub required: bool,
}

/// Shift thresholds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Check-ins after this time (HH:MM) are late
    pub shift_start: Option<String>,

    /// Check-outs before this time (HH:MM) are early
    pub shift_end: Option<String>,
}

/// Raw site definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSite {
    /// Unique stable ID
    pub id: String,

    /// Display label
    pub label: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Geofence radius in meters (default 100)
    pub radius_meters: Option<f64>,

    /// Per-site threshold overrides
    #[serde(default)]
    pub schedule: Option<RawSchedule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_site_entry() {
        let toml_str = r#"
            config_version = 1

            [[sites]]
            id = "hq"
            label = "Head office"
            latitude = 39.908823
            longitude = 116.397470
            radius_meters = 150
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].id, "hq");
        assert_eq!(config.sites[0].radius_meters, Some(150.0));
    }

    #[test]
    fn parse_schedules() {
        let toml_str = r#"
            config_version = 1

            [schedule]
            shift_start = "09:00"
            shift_end = "18:00"

            [[sites]]
            id = "warehouse"
            label = "Warehouse"
            latitude = 31.2304
            longitude = 121.4737

            [sites.schedule]
            shift_start = "07:30"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        let global = config.schedule.as_ref().unwrap();
        assert_eq!(global.shift_end.as_deref(), Some("18:00"));

        let site = config.sites[0].schedule.as_ref().unwrap();
        assert_eq!(site.shift_start.as_deref(), Some("07:30"));
        assert!(site.shift_end.is_none());
    }
}

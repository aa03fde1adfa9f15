//! Configuration validation

use crate::schema::{RawConfig, RawSchedule, RawSite};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Site '{site_id}': {message}")]
    SiteError { site_id: String, message: String },

    #[error("Duplicate site ID: {0}")]
    DuplicateSiteId(String),

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Shift start {start} is not before shift end {end} ({scope})")]
    ShiftOrder {
        scope: String,
        start: String,
        end: String,
    },

    #[error("Default site '{0}' is not defined")]
    UnknownDefaultSite(String),

    #[error("At least one site must be configured")]
    NoSites,

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.sites.is_empty() {
        errors.push(ValidationError::NoSites);
    }

    // Check for duplicate site IDs
    let mut seen_ids = HashSet::new();
    for site in &config.sites {
        if !seen_ids.insert(&site.id) {
            errors.push(ValidationError::DuplicateSiteId(site.id.clone()));
        }
    }

    if let Some(default_site) = &config.service.default_site
        && !seen_ids.contains(default_site)
    {
        errors.push(ValidationError::UnknownDefaultSite(default_site.clone()));
    }

    if config.service.location_timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "location_timeout_seconds must be greater than 0".into(),
        ));
    }
    if config.service.verification_timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "verification_timeout_seconds must be greater than 0".into(),
        ));
    }

    if let Some(schedule) = &config.schedule {
        errors.extend(validate_schedule(schedule, None, "global schedule"));
    }

    for site in &config.sites {
        errors.extend(validate_site(site, config.schedule.as_ref()));
    }

    errors
}

fn validate_site(site: &RawSite, global: Option<&RawSchedule>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if site.id.trim().is_empty() {
        errors.push(ValidationError::SiteError {
            site_id: site.id.clone(),
            message: "id cannot be empty".into(),
        });
    }

    if !(-90.0..=90.0).contains(&site.latitude) {
        errors.push(ValidationError::SiteError {
            site_id: site.id.clone(),
            message: format!("latitude {} must be within [-90, 90]", site.latitude),
        });
    }

    if !(-180.0..=180.0).contains(&site.longitude) {
        errors.push(ValidationError::SiteError {
            site_id: site.id.clone(),
            message: format!("longitude {} must be within [-180, 180]", site.longitude),
        });
    }

    if let Some(radius) = site.radius_meters
        && (!radius.is_finite() || radius <= 0.0)
    {
        errors.push(ValidationError::SiteError {
            site_id: site.id.clone(),
            message: format!("radius_meters {} must be positive", radius),
        });
    }

    if let Some(schedule) = &site.schedule {
        let scope = format!("site '{}'", site.id);
        errors.extend(validate_schedule(schedule, global, &scope));
    }

    errors
}

/// Validate a schedule, checking ordering against inherited thresholds
fn validate_schedule(
    schedule: &RawSchedule,
    inherited: Option<&RawSchedule>,
    scope: &str,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for value in [&schedule.shift_start, &schedule.shift_end].into_iter().flatten() {
        if let Err(message) = parse_time(value) {
            errors.push(ValidationError::InvalidTimeFormat {
                value: value.clone(),
                message,
            });
        }
    }

    let start = schedule
        .shift_start
        .as_ref()
        .or(inherited.and_then(|s| s.shift_start.as_ref()));
    let end = schedule
        .shift_end
        .as_ref()
        .or(inherited.and_then(|s| s.shift_end.as_ref()));

    if let (Some(start), Some(end)) = (start, end)
        && let (Ok(s), Ok(e)) = (parse_time(start), parse_time(end))
        && s >= e
    {
        errors.push(ValidationError::ShiftOrder {
            scope: scope.to_string(),
            start: start.clone(),
            end: end.clone(),
        });
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<(u8, u8), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = parts[0]
        .parse()
        .map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = parts[1]
        .parse()
        .map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }

    Ok((hour, minute))
}

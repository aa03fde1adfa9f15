//! Geofence evaluation

use gigclock_api::{Coordinate, Site};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters, unrounded.
///
/// Used for all range comparisons so that a position sitting on the
/// boundary does not flip in and out with rounding.
pub fn haversine_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance in meters as surfaced to callers, rounded to the nearest meter
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_meters(a, b).round()
}

/// Whether `current` lies within the site's allowed radius
pub fn is_within_range(current: &Coordinate, site: &Site) -> bool {
    check(current, site).within_range
}

/// Outcome of measuring a position against a site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    raw_distance: f64,
    pub within_range: bool,
}

impl GeofenceCheck {
    /// Rounded distance to the site
    pub fn distance_meters(&self) -> f64 {
        self.raw_distance.round()
    }
}

/// Measure `current` against the site geofence
pub fn check(current: &Coordinate, site: &Site) -> GeofenceCheck {
    let raw_distance = haversine_meters(current, &site.coordinate);
    GeofenceCheck {
        raw_distance,
        within_range: raw_distance <= site.allowed_radius_meters,
    }
}

/// Human-readable distance: meters below 1 km, otherwise kilometers with one decimal
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round())
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

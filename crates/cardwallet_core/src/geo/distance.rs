//! Haversine distance and tiered distance formatting.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters to `other`.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(self.lat, self.lng, other.lat, other.lng)
    }

    /// Returns whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Returns whether `lat` is within `[-90, 90]` and `lng` within `[-180, 180]`.
    ///
    /// The store itself accepts any value; callers use this to reject bad
    /// position samples before they reach the core.
    pub fn is_within_bounds(&self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Computes the great-circle distance in meters between two points.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Formats a distance for display.
///
/// Tiers:
/// - `< 100 m`: whole meters (`"42m"`).
/// - `100..1000 m`: nearest 10 meters (`"350m"`).
/// - `1..10 km`: kilometers with one decimal (`"2.5km"`).
/// - `>= 10 km`: whole kilometers (`"12km"`).
pub fn format_distance(meters: f64) -> String {
    if meters < 100.0 {
        format!("{}m", meters.round() as i64)
    } else if meters < 1_000.0 {
        format!("{}m", (meters / 10.0).round() as i64 * 10)
    } else if meters < 10_000.0 {
        format!("{:.1}km", meters / 1_000.0)
    } else {
        format!("{}km", (meters / 1_000.0).round() as i64)
    }
}

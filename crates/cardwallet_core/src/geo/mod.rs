//! Great-circle distance math and distance presentation helpers.
//!
//! # Responsibility
//! - Compute haversine distances between WGS84 degree coordinates.
//! - Render distances as short human-readable labels.
//!
//! # Invariants
//! - Every function here is pure and never validates coordinate ranges.
//! - `distance_meters(a, b) == distance_meters(b, a)` up to float rounding.

mod distance;

pub use distance::{distance_meters, format_distance, Coordinate, EARTH_RADIUS_METERS};

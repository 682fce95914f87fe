//! Proximity ranking of stored cards.
//!
//! # Responsibility
//! - Rank cards by the distance from a query point to their nearest location.
//! - Provide presentation classifiers (`is_nearby`, `proximity_score`).
//!
//! # Invariants
//! - Ranking is pure: it never touches storage and never mutates cards.
//! - Results are non-decreasing in `nearest_distance` and never exceed `limit`.

mod ranking;

pub use ranking::{
    is_nearby, proximity_score, top_cards, Recommendation, DEFAULT_RECOMMENDATION_LIMIT,
    NEARBY_RADIUS_METERS,
};

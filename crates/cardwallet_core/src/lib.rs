//! Core domain logic for the card wallet.
//! This crate is the single source of truth for card store invariants and
//! proximity ranking.

pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod recommend;
pub mod repo;
pub mod service;

pub use geo::{distance_meters, format_distance, Coordinate};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::card::{
    Card, CardId, CardValidationError, Location, LocationChange, NewLocation,
    DEDUP_RADIUS_METERS,
};
pub use recommend::{
    is_nearby, proximity_score, top_cards, Recommendation, DEFAULT_RECOMMENDATION_LIMIT,
    NEARBY_RADIUS_METERS,
};
pub use repo::card_repo::{
    CardRepository, LocationUpdate, NewCard, RepoError, RepoResult, SqliteCardRepository,
};
pub use service::card_service::CardService;
pub use service::recommend_service::RecommendService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

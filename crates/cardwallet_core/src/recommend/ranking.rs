//! Nearest-location ranking and distance classifiers.

use crate::geo::Coordinate;
use crate::model::card::{Card, Location};

/// Default short-list size shown to users.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 4;

/// Cards whose nearest location is within this distance count as nearby.
pub const NEARBY_RADIUS_METERS: f64 = 300.0;

const FULL_SCORE_RADIUS_METERS: f64 = 100.0;
const ZERO_SCORE_RADIUS_METERS: f64 = 1_000.0;

/// One ranked card with the location that placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub card: Card,
    /// Meters from the query point to `nearest_location`.
    pub nearest_distance: f64,
    pub nearest_location: Location,
}

impl Recommendation {
    pub fn is_nearby(&self) -> bool {
        is_nearby(self.nearest_distance)
    }

    pub fn score(&self) -> u8 {
        proximity_score(self.nearest_distance)
    }
}

/// Ranks `cards` by nearest location to `position` and keeps the first `limit`.
///
/// Returns an empty list when `position` is absent or non-finite, or when
/// `limit` is zero. Cards without locations are skipped. Equal distances keep
/// their input order.
pub fn top_cards(
    position: Option<Coordinate>,
    cards: impl IntoIterator<Item = Card>,
    limit: usize,
) -> Vec<Recommendation> {
    let Some(origin) = position.filter(Coordinate::is_finite) else {
        return Vec::new();
    };
    if limit == 0 {
        return Vec::new();
    }

    let mut ranked = cards
        .into_iter()
        .filter_map(|card| rank_card(&origin, card))
        .collect::<Vec<_>>();

    // `sort_by` is stable, which keeps input order among equal distances.
    ranked.sort_by(|a, b| a.nearest_distance.total_cmp(&b.nearest_distance));
    ranked.truncate(limit);
    ranked
}

fn rank_card(origin: &Coordinate, card: Card) -> Option<Recommendation> {
    let (index, nearest_distance) = card
        .locations
        .iter()
        .map(|location| origin.distance_to(&location.coordinate()))
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (index, distance)| match best {
            Some((_, best_distance)) if distance >= best_distance => best,
            _ => Some((index, distance)),
        })?;

    let nearest_location = card.locations[index].clone();
    Some(Recommendation {
        card,
        nearest_distance,
        nearest_location,
    })
}

/// Returns whether `distance` (meters) is within the nearby radius.
pub fn is_nearby(distance: f64) -> bool {
    distance <= NEARBY_RADIUS_METERS
}

/// Maps a distance in meters to a 0-100 relevance score.
///
/// 100 up to 100 m, 0 from 1 km, linear `100 - distance / 10` in between.
pub fn proximity_score(distance: f64) -> u8 {
    if distance <= FULL_SCORE_RADIUS_METERS {
        return 100;
    }
    if distance >= ZERO_SCORE_RADIUS_METERS {
        return 0;
    }
    (100.0 - distance / 10.0).round().clamp(0.0, 100.0) as u8
}

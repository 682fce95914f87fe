//! Card domain model.
//!
//! # Responsibility
//! - Define the card record stored by the repository layer.
//! - Apply location insertion/removal rules against an in-memory snapshot.
//!
//! # Invariants
//! - `name` is never empty or whitespace-only.
//! - `locations` keeps insertion order; removal shifts later entries down.
//! - `updated_at` only moves forward and only on successful mutations.

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned card identifier. Positive and monotonic.
pub type CardId = i64;

/// Two locations on one card closer than this are treated as the same place.
pub const DEDUP_RADIUS_METERS: f64 = 50.0;

/// Validation errors for card data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    /// Card name is empty after trimming.
    EmptyName,
    /// Card id must be a positive store-assigned value.
    InvalidId(CardId),
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "card name must not be empty"),
            Self::InvalidId(id) => write!(f, "card id must be positive, got {id}"),
        }
    }
}

impl Error for CardValidationError {}

/// One geographic point attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// Caller label, or `Location N` assigned at insertion time.
    pub name: String,
    /// Unix epoch milliseconds.
    pub added_at: i64,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Candidate location supplied by callers before dedup and naming.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub lat: f64,
    pub lng: f64,
    pub name: Option<String>,
}

impl NewLocation {
    /// Creates an unnamed candidate; a positional default name is used.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            name: None,
        }
    }

    /// Creates a candidate with an explicit label.
    pub fn named(lat: f64, lng: f64, name: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: Some(name.into()),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Outcome of a location mutation against one card snapshot.
///
/// `Duplicate` and `IndexOutOfRange` are soft no-ops: the call succeeds and
/// the card is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationChange {
    /// Appended at the given index.
    Added(usize),
    /// Within `DEDUP_RADIUS_METERS` of an existing location; dropped.
    Duplicate,
    /// Removed entry, returned for callers that want to display it.
    Removed(Location),
    /// Requested removal index does not exist.
    IndexOutOfRange,
}

impl LocationChange {
    /// Returns whether the card was mutated.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Added(_) | Self::Removed(_))
    }
}

/// Canonical card record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CardFields")]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// Opaque encoded image produced by the capture pipeline.
    pub combined_image: Vec<u8>,
    pub locations: Vec<Location>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Refreshed on every successful mutation.
    pub updated_at: i64,
}

#[derive(Deserialize)]
struct CardFields {
    id: CardId,
    name: String,
    combined_image: Vec<u8>,
    locations: Vec<Location>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<CardFields> for Card {
    type Error = CardValidationError;

    fn try_from(value: CardFields) -> Result<Self, Self::Error> {
        let card = Self {
            id: value.id,
            name: value.name,
            combined_image: value.combined_image,
            locations: value.locations,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };
        card.validate()?;
        Ok(card)
    }
}

impl Card {
    /// Creates an empty-location card stamped with `now` for both timestamps.
    ///
    /// The name is trimmed before validation.
    pub fn new(
        id: CardId,
        name: &str,
        combined_image: Vec<u8>,
        now: i64,
    ) -> Result<Self, CardValidationError> {
        let card = Self {
            id,
            name: name.trim().to_string(),
            combined_image,
            locations: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        card.validate()?;
        Ok(card)
    }

    /// Validates invariants that must hold for persisted cards.
    pub fn validate(&self) -> Result<(), CardValidationError> {
        if self.id <= 0 {
            return Err(CardValidationError::InvalidId(self.id));
        }
        validate_card_name(&self.name)
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Returns whether `candidate` lies within the dedup radius of any
    /// existing location.
    pub fn has_location_near(&self, candidate: &Coordinate) -> bool {
        self.locations
            .iter()
            .any(|location| location.coordinate().distance_to(candidate) < DEDUP_RADIUS_METERS)
    }

    /// Appends `candidate` unless it duplicates an existing location.
    pub fn push_location(&mut self, candidate: NewLocation, now: i64) -> LocationChange {
        if self.has_location_near(&candidate.coordinate()) {
            return LocationChange::Duplicate;
        }

        let index = self.locations.len();
        let name = candidate
            .name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_location_name(index));

        self.locations.push(Location {
            lat: candidate.lat,
            lng: candidate.lng,
            name,
            added_at: now,
        });
        self.touch(now);
        LocationChange::Added(index)
    }

    /// Removes the location at `index`, shifting later entries down.
    pub fn remove_location(&mut self, index: usize, now: i64) -> LocationChange {
        if index >= self.locations.len() {
            return LocationChange::IndexOutOfRange;
        }

        let removed = self.locations.remove(index);
        self.touch(now);
        LocationChange::Removed(removed)
    }

    /// Replaces the display name.
    pub fn rename(&mut self, name: &str, now: i64) -> Result<(), CardValidationError> {
        let trimmed = name.trim();
        validate_card_name(trimmed)?;
        self.name = trimmed.to_string();
        self.touch(now);
        Ok(())
    }

    fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now);
    }
}

/// Rejects empty or whitespace-only card names.
pub fn validate_card_name(name: &str) -> Result<(), CardValidationError> {
    if name.trim().is_empty() {
        return Err(CardValidationError::EmptyName);
    }
    Ok(())
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

fn default_location_name(existing_count: usize) -> String {
    format!("Location {}", existing_count + 1)
}

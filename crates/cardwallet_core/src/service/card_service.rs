//! Card store use-case service.
//!
//! # Responsibility
//! - Provide the card store entry points used by FFI/CLI callers.
//! - Emit metadata-only diagnostics for every mutation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or transactions.
//! - Errors are always returned to the caller; logging never swallows them.
//! - Card names, image bytes and coordinates are never logged.

use crate::model::card::{Card, CardId, LocationChange, NewLocation};
use crate::repo::card_repo::{CardRepository, LocationUpdate, NewCard, RepoResult};
use log::{debug, info, warn};

/// Use-case facade over a card repository.
pub struct CardService<R: CardRepository> {
    repo: R,
}

impl<R: CardRepository> CardService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a card and returns its store-assigned id.
    ///
    /// `initial_locations` go through the same 50 m dedup as
    /// `add_location_to_card`.
    pub fn add_card(
        &self,
        name: impl Into<String>,
        combined_image: Vec<u8>,
        initial_locations: Vec<NewLocation>,
    ) -> RepoResult<CardId> {
        let request = NewCard::new(name, combined_image).with_locations(initial_locations);
        let image_bytes = request.combined_image.len();
        let result = self.repo.create_card(&request);
        match &result {
            Ok(card_id) => info!(
                "event=card_add module=card_service status=ok card_id={card_id} image_bytes={image_bytes}"
            ),
            Err(err) => warn!("event=card_add module=card_service status=error error={err}"),
        }
        result
    }

    /// Gets one card; `Ok(None)` when the id is unknown.
    pub fn get_card(&self, id: CardId) -> RepoResult<Option<Card>> {
        self.repo.get_card(id)
    }

    /// Lists every stored card in ascending id order.
    pub fn list_cards(&self) -> RepoResult<Vec<Card>> {
        self.repo.list_cards()
    }

    /// Permanently deletes a card. Unknown ids return `RepoError::NotFound`.
    pub fn delete_card(&self, id: CardId) -> RepoResult<()> {
        let result = self.repo.delete_card(id);
        match &result {
            Ok(()) => info!("event=card_delete module=card_service status=ok card_id={id}"),
            Err(err) => {
                warn!("event=card_delete module=card_service status=error card_id={id} error={err}")
            }
        }
        result
    }

    /// Renames a card.
    pub fn rename_card(&self, id: CardId, name: &str) -> RepoResult<Card> {
        let result = self.repo.rename_card(id, name);
        match &result {
            Ok(_) => info!("event=card_rename module=card_service status=ok card_id={id}"),
            Err(err) => {
                warn!("event=card_rename module=card_service status=error card_id={id} error={err}")
            }
        }
        result
    }

    /// Attaches a location to a card.
    ///
    /// # Contract
    /// - Unknown id returns `RepoError::NotFound`.
    /// - A point closer than 50 m to an existing location is a soft no-op
    ///   reported as `LocationChange::Duplicate`.
    /// - Otherwise the location is appended; a missing name becomes
    ///   `Location N`.
    pub fn add_location_to_card(
        &self,
        id: CardId,
        lat: f64,
        lng: f64,
        name: Option<String>,
    ) -> RepoResult<LocationUpdate> {
        let candidate = NewLocation { lat, lng, name };
        let update = self.repo.add_location(id, candidate)?;
        log_location_change("card_location_add", id, &update);
        Ok(update)
    }

    /// Removes the location at `index`.
    ///
    /// # Contract
    /// - Unknown id returns `RepoError::NotFound`.
    /// - Out-of-range index is a soft no-op reported as
    ///   `LocationChange::IndexOutOfRange`.
    pub fn remove_location_from_card(&self, id: CardId, index: usize) -> RepoResult<LocationUpdate> {
        let update = self.repo.remove_location(id, index)?;
        log_location_change("card_location_remove", id, &update);
        Ok(update)
    }
}

fn log_location_change(event: &str, card_id: CardId, update: &LocationUpdate) {
    let outcome = match update.change {
        LocationChange::Added(_) | LocationChange::Removed(_) => "applied",
        LocationChange::Duplicate => "skipped_duplicate",
        LocationChange::IndexOutOfRange => "skipped_out_of_range",
    };
    debug!(
        "event={event} module=card_service status=ok card_id={card_id} outcome={outcome} location_count={}",
        update.card.location_count()
    );
}

//! Recommendation use-case service.
//!
//! Reads the full card set through the repository and ranks it with
//! `recommend::top_cards`.

use crate::geo::Coordinate;
use crate::recommend::{top_cards, Recommendation};
use crate::repo::card_repo::{CardRepository, RepoResult};
use log::debug;

/// Ranks stored cards around caller-supplied position samples.
pub struct RecommendService<R: CardRepository> {
    repo: R,
}

impl<R: CardRepository> RecommendService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns up to `limit` cards nearest to `position`.
    ///
    /// A missing position short-circuits to an empty list without reading
    /// storage.
    pub fn recommend(
        &self,
        position: Option<Coordinate>,
        limit: usize,
    ) -> RepoResult<Vec<Recommendation>> {
        if position.is_none() {
            return Ok(Vec::new());
        }

        let cards = self.repo.list_cards()?;
        let candidate_count = cards.len();
        let ranked = top_cards(position, cards, limit);
        debug!(
            "event=card_recommend module=recommend_service status=ok candidates={candidate_count} returned={} limit={limit}",
            ranked.len()
        );
        Ok(ranked)
    }
}

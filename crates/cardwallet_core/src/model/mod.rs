//! Card wallet domain model.
//!
//! # Responsibility
//! - Define the canonical `Card` record and its ordered `Location` list.
//! - Own the pure location-list rules (proximity dedup, splice removal).
//!
//! # Invariants
//! - Every card is identified by a store-assigned, never reused `CardId`.
//! - No two locations on one card are closer than `DEDUP_RADIUS_METERS`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod card;

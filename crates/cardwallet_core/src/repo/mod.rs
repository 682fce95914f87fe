//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the card store data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate card names before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to storage errors; soft no-ops are reported as `LocationChange`.

pub mod card_repo;

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise the core end to end against a throwaway in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use cardwallet_core::db::open_db_in_memory;
use cardwallet_core::{
    format_distance, CardService, Coordinate, NewLocation, RecommendService,
    SqliteCardRepository, DEFAULT_RECOMMENDATION_LIMIT,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("cardwallet_core ping={}", cardwallet_core::ping());
    println!("cardwallet_core version={}", cardwallet_core::core_version());

    match run_smoke() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cardwallet smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_smoke() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let cards = CardService::new(SqliteCardRepository::try_new(&conn)?);

    let station = cards.add_card(
        "Station cafe",
        Vec::new(),
        vec![NewLocation::named(35.681236, 139.767125, "Tokyo Station")],
    )?;
    cards.add_card(
        "Ward library",
        Vec::new(),
        vec![NewLocation::new(35.690921, 139.700258)],
    )?;
    let update = cards.add_location_to_card(station, 35.681240, 139.767130, None)?;
    println!(
        "cardwallet_core dedup_change={:?} locations={}",
        update.change,
        update.card.location_count()
    );

    let recommender = RecommendService::new(SqliteCardRepository::try_new(&conn)?);
    let position = Coordinate::new(35.6812, 139.7671);
    for item in recommender.recommend(Some(position), DEFAULT_RECOMMENDATION_LIMIT)? {
        println!(
            "cardwallet_core recommend card_id={} distance={} score={}",
            item.card.id,
            format_distance(item.nearest_distance),
            item.score()
        );
    }
    Ok(())
}

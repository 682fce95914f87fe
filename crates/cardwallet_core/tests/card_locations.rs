use cardwallet_core::db::{open_db, open_db_in_memory};
use cardwallet_core::{
    CardRepository, CardService, LocationChange, NewCard, NewLocation, RepoError,
    SqliteCardRepository,
};
use std::path::Path;
use std::thread;

#[test]
fn nearby_point_is_deduplicated_and_distant_point_is_appended() {
    let conn = open_db_in_memory().unwrap();
    let service = CardService::new(SqliteCardRepository::try_new(&conn).unwrap());
    let id = service
        .add_card("Loyalty", Vec::new(), vec![NewLocation::new(35.0, 139.0)])
        .unwrap();
    let original = service.get_card(id).unwrap().unwrap();

    let duplicate = service
        .add_location_to_card(id, 35.00001, 139.00001, None)
        .unwrap();
    assert_eq!(duplicate.change, LocationChange::Duplicate);
    assert_eq!(duplicate.card, original);
    assert_eq!(service.get_card(id).unwrap().unwrap(), original);

    let added = service
        .add_location_to_card(id, 35.01, 139.01, None)
        .unwrap();
    assert_eq!(added.change, LocationChange::Added(1));
    assert_eq!(added.card.location_count(), 2);
    assert_eq!(added.card.locations[1].name, "Location 2");
    assert_eq!(service.get_card(id).unwrap().unwrap(), added.card);
}

#[test]
fn dedup_threshold_is_fifty_meters() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    repo.add_location(id, NewLocation::new(0.0, 0.0)).unwrap();

    // 0.0004 degrees of latitude is about 44.5 m, 0.0005 about 55.6 m.
    let inside = repo.add_location(id, NewLocation::new(0.0004, 0.0)).unwrap();
    assert_eq!(inside.change, LocationChange::Duplicate);

    let outside = repo.add_location(id, NewLocation::new(0.0005, 0.0)).unwrap();
    assert_eq!(outside.change, LocationChange::Added(1));
}

#[test]
fn dedup_checks_every_existing_location() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    repo.add_location(id, NewLocation::new(35.0, 139.0)).unwrap();
    repo.add_location(id, NewLocation::new(36.0, 140.0)).unwrap();

    let update = repo
        .add_location(id, NewLocation::new(36.00001, 140.0))
        .unwrap();
    assert_eq!(update.change, LocationChange::Duplicate);
    assert_eq!(update.card.location_count(), 2);
}

#[test]
fn add_location_keeps_caller_name_and_refreshes_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    conn.execute("UPDATE cards SET updated_at = 1 WHERE id = ?1;", [id])
        .unwrap();

    let update = repo
        .add_location(id, NewLocation::named(35.0, 139.0, "Shibuya branch"))
        .unwrap();

    assert_eq!(update.card.locations[0].name, "Shibuya branch");
    assert!(update.card.updated_at > 1);
    assert_eq!(
        update.card.locations[0].added_at,
        update.card.updated_at
    );
    let stored = repo.get_card(id).unwrap().unwrap();
    assert_eq!(stored.updated_at, update.card.updated_at);
}

#[test]
fn duplicate_insert_does_not_touch_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    repo.add_location(id, NewLocation::new(35.0, 139.0)).unwrap();
    conn.execute("UPDATE cards SET updated_at = 1 WHERE id = ?1;", [id])
        .unwrap();

    repo.add_location(id, NewLocation::new(35.0, 139.0)).unwrap();

    assert_eq!(repo.get_card(id).unwrap().unwrap().updated_at, 1);
}

#[test]
fn add_location_to_unknown_card_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();

    let err = repo
        .add_location(7, NewLocation::new(35.0, 139.0))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(7)));
}

#[test]
fn remove_location_shifts_later_entries_down() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    for (index, lat) in [35.0, 35.1, 35.2, 35.3].into_iter().enumerate() {
        repo.add_location(id, NewLocation::named(lat, 139.0, format!("p{index}")))
            .unwrap();
    }

    conn.execute("UPDATE cards SET updated_at = 1 WHERE id = ?1;", [id])
        .unwrap();

    let update = repo.remove_location(id, 1).unwrap();
    assert!(matches!(update.change, LocationChange::Removed(ref removed) if removed.name == "p1"));
    assert!(update.card.updated_at > 1);

    let stored = repo.get_card(id).unwrap().unwrap();
    let names = stored
        .locations
        .iter()
        .map(|location| location.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["p0", "p2", "p3"]);
    assert_eq!(stored, update.card);

    repo.remove_location(id, 2).unwrap();
    repo.remove_location(id, 0).unwrap();
    let stored = repo.get_card(id).unwrap().unwrap();
    assert_eq!(stored.locations.len(), 1);
    assert_eq!(stored.locations[0].name, "p2");
}

#[test]
fn remove_out_of_range_index_is_a_soft_no_op() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let id = repo.create_card(&NewCard::new("Gym", Vec::new())).unwrap();
    repo.add_location(id, NewLocation::new(35.0, 139.0)).unwrap();
    let before = repo.get_card(id).unwrap().unwrap();

    let update = repo.remove_location(id, 1).unwrap();

    assert_eq!(update.change, LocationChange::IndexOutOfRange);
    assert_eq!(update.card, before);
    assert_eq!(repo.get_card(id).unwrap().unwrap(), before);
}

#[test]
fn remove_location_from_unknown_card_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = CardService::new(SqliteCardRepository::try_new(&conn).unwrap());

    let err = service.remove_location_from_card(3, 0).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(3)));
}

#[test]
fn locations_of_different_cards_do_not_dedup_each_other() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let first = repo.create_card(&NewCard::new("A", Vec::new())).unwrap();
    let second = repo.create_card(&NewCard::new("B", Vec::new())).unwrap();

    repo.add_location(first, NewLocation::new(35.0, 139.0)).unwrap();
    let update = repo
        .add_location(second, NewLocation::new(35.0, 139.0))
        .unwrap();

    assert_eq!(update.change, LocationChange::Added(0));
}

#[test]
fn concurrent_writers_on_one_card_lose_no_updates() {
    const WRITERS: usize = 4;
    const INSERTS_PER_WRITER: usize = 10;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteCardRepository::try_new(&conn).unwrap();
        repo.create_card(&NewCard::new("Shared", Vec::new())).unwrap()
    };

    let handles = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || add_spread_locations(&path, id, writer, INSERTS_PER_WRITER))
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    let card = repo.get_card(id).unwrap().unwrap();
    assert_eq!(card.location_count(), WRITERS * INSERTS_PER_WRITER);
}

/// Each writer walks its own longitude band in 0.01 degree latitude steps (~1.1 km),
/// so no insert can be a duplicate of another.
fn add_spread_locations(path: &Path, id: i64, writer: usize, count: usize) {
    let conn = open_db(path).unwrap();
    let repo = SqliteCardRepository::try_new(&conn).unwrap();
    for step in 0..count {
        let lat = 35.0 + step as f64 * 0.01;
        let lng = 139.0 + writer as f64 * 0.5;
        let update = repo.add_location(id, NewLocation::new(lat, lng)).unwrap();
        assert!(matches!(update.change, LocationChange::Added(_)));
    }
}

use cardwallet_core::db::open_db_in_memory;
use cardwallet_core::{
    format_distance, CardRepository, Coordinate, NewCard, NewLocation, RecommendService,
    SqliteCardRepository, DEFAULT_RECOMMENDATION_LIMIT,
};
use rusqlite::Connection;

const METERS_PER_DEGREE_LAT: f64 = 111_194.93;
const ORIGIN: Coordinate = Coordinate {
    lat: 35.0,
    lng: 139.0,
};

fn north_of_origin(meters: f64) -> NewLocation {
    NewLocation::new(ORIGIN.lat + meters / METERS_PER_DEGREE_LAT, ORIGIN.lng)
}

fn seed(conn: &Connection, name: &str, locations: Vec<NewLocation>) -> i64 {
    let repo = SqliteCardRepository::try_new(conn).unwrap();
    repo.create_card(&NewCard::new(name, Vec::new()).with_locations(locations))
        .unwrap()
}

#[test]
fn recommends_closest_cards_first_and_respects_limit() {
    let conn = open_db_in_memory().unwrap();
    let near = seed(&conn, "Near", vec![north_of_origin(50.0)]);
    let _far = seed(&conn, "Far", vec![north_of_origin(2_000.0)]);
    let mid = seed(&conn, "Mid", vec![north_of_origin(300.0)]);

    let service = RecommendService::new(SqliteCardRepository::try_new(&conn).unwrap());
    let ranked = service.recommend(Some(ORIGIN), 2).unwrap();

    let ids = ranked.iter().map(|item| item.card.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![near, mid]);
    assert_eq!(format_distance(ranked[0].nearest_distance), "50m");
    assert_eq!(format_distance(ranked[1].nearest_distance), "300m");
    assert!(ranked[0].is_nearby());
    assert!(ranked[1].is_nearby());
    assert_eq!(ranked[0].score(), 100);
}

#[test]
fn missing_position_returns_empty_list() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, "Near", vec![north_of_origin(10.0)]);

    let service = RecommendService::new(SqliteCardRepository::try_new(&conn).unwrap());

    assert!(service
        .recommend(None, DEFAULT_RECOMMENDATION_LIMIT)
        .unwrap()
        .is_empty());
}

#[test]
fn never_returns_location_less_cards_or_more_than_limit() {
    let conn = open_db_in_memory().unwrap();
    for index in 0..6 {
        seed(
            &conn,
            &format!("With {index}"),
            vec![north_of_origin(100.0 * f64::from(index) + 75.0)],
        );
        seed(&conn, &format!("Without {index}"), Vec::new());
    }

    let service = RecommendService::new(SqliteCardRepository::try_new(&conn).unwrap());
    let ranked = service
        .recommend(Some(ORIGIN), DEFAULT_RECOMMENDATION_LIMIT)
        .unwrap();

    assert_eq!(ranked.len(), DEFAULT_RECOMMENDATION_LIMIT);
    assert!(ranked.iter().all(|item| item.card.location_count() > 0));
    assert!(ranked
        .windows(2)
        .all(|pair| pair[0].nearest_distance <= pair[1].nearest_distance));
}

#[test]
fn uses_each_cards_nearest_location() {
    let conn = open_db_in_memory().unwrap();
    let spread = seed(
        &conn,
        "Chain store",
        vec![
            NewLocation::named(36.0, 140.0, "Remote branch"),
            NewLocation::named(ORIGIN.lat + 400.0 / METERS_PER_DEGREE_LAT, ORIGIN.lng, "Local branch"),
        ],
    );
    let single = seed(&conn, "Single", vec![north_of_origin(600.0)]);

    let service = RecommendService::new(SqliteCardRepository::try_new(&conn).unwrap());
    let ranked = service.recommend(Some(ORIGIN), 10).unwrap();

    assert_eq!(ranked[0].card.id, spread);
    assert_eq!(ranked[0].nearest_location.name, "Local branch");
    assert_eq!(ranked[0].score(), 60);
    assert_eq!(ranked[1].card.id, single);
    assert!(!ranked[1].is_nearby());
}

#[test]
fn zero_limit_returns_empty_list() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, "Near", vec![north_of_origin(10.0)]);

    let service = RecommendService::new(SqliteCardRepository::try_new(&conn).unwrap());

    assert!(service.recommend(Some(ORIGIN), 0).unwrap().is_empty());
}

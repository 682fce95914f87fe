use cardwallet_core::db::migrations::latest_version;
use cardwallet_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "store_meta");
    assert_table_exists(&conn, "cards");
    assert_table_exists(&conn, "card_locations");
}

#[test]
fn fresh_store_starts_id_counter_at_one() {
    let conn = open_db_in_memory().unwrap();

    let next: i64 = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'next_card_id';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(next, 1);
}

#[test]
fn foreign_keys_are_enabled() {
    let conn = open_db_in_memory().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cardwallet.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "cards");
}

#[test]
fn concurrent_first_opens_apply_migrations_once() {
    const OPENERS: usize = 4;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let barrier = Arc::new(Barrier::new(OPENERS));

    let handles = (0..OPENERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                open_db(&path).map(|conn| schema_version(&conn))
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let version = handle.join().unwrap().unwrap();
        assert_eq!(version, latest_version());
    }

    let conn = open_db(&path).unwrap();
    let seeded: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM store_meta WHERE key = 'next_card_id';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(seeded, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

//! Card repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/delete APIs over `cards` and `card_locations`.
//! - Apply location dedup and splice removal against a consistent snapshot.
//! - Assign card ids from the persisted `store_meta.next_card_id` counter.
//!
//! # Invariants
//! - Every read-modify-write runs inside one `IMMEDIATE` transaction, so two
//!   writers of the same card can never interleave.
//! - `card_locations.position` is contiguous from 0 per card.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::card::{
    now_epoch_ms, validate_card_name, Card, CardId, CardValidationError, Location,
    LocationChange, NewLocation,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CARD_SELECT_SQL: &str = "SELECT
    id,
    name,
    combined_image,
    created_at,
    updated_at
FROM cards";

const LOCATION_SELECT_SQL: &str = "SELECT
    card_id,
    position,
    lat,
    lng,
    name,
    added_at
FROM card_locations";

const NEXT_CARD_ID_KEY: &str = "next_card_id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for card persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller-supplied data violates a precondition.
    Validation(CardValidationError),
    /// Referenced card does not exist.
    NotFound(CardId),
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the durability layer failed, as opposed to a caller
    /// error (`Validation`, `NotFound`).
    pub fn is_storage_failure(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "card not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted card data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db first"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CardValidationError> for RepoError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Input for card creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub name: String,
    /// Opaque encoded image; stored byte-for-byte.
    pub combined_image: Vec<u8>,
    /// Applied in order with the same dedup rule as `add_location`.
    pub locations: Vec<NewLocation>,
}

impl NewCard {
    pub fn new(name: impl Into<String>, combined_image: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            combined_image,
            locations: Vec::new(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<NewLocation>) -> Self {
        self.locations = locations;
        self
    }
}

/// Card snapshot after a location mutation plus what actually happened.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub card: Card,
    pub change: LocationChange,
}

/// Repository interface for the card store.
pub trait CardRepository {
    /// Creates one card and returns its freshly assigned id.
    fn create_card(&self, card: &NewCard) -> RepoResult<CardId>;
    /// Gets one card by id; `None` when unknown.
    fn get_card(&self, id: CardId) -> RepoResult<Option<Card>>;
    /// Lists every card in ascending id order.
    fn list_cards(&self) -> RepoResult<Vec<Card>>;
    /// Permanently deletes a card and its locations.
    fn delete_card(&self, id: CardId) -> RepoResult<()>;
    /// Replaces the card display name.
    fn rename_card(&self, id: CardId, name: &str) -> RepoResult<Card>;
    /// Appends a location unless it is within the dedup radius.
    fn add_location(&self, id: CardId, location: NewLocation) -> RepoResult<LocationUpdate>;
    /// Removes the location at `index`; out-of-range is a soft no-op.
    fn remove_location(&self, id: CardId, index: usize) -> RepoResult<LocationUpdate>;
}

/// SQLite-backed card repository.
pub struct SqliteCardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCardRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` for foreign schemas.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_card_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin_write(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl CardRepository for SqliteCardRepository<'_> {
    fn create_card(&self, card: &NewCard) -> RepoResult<CardId> {
        validate_card_name(&card.name)?;

        let tx = self.begin_write()?;
        let id = take_next_card_id(&tx)?;
        let now = now_epoch_ms();

        let mut created = Card::new(id, &card.name, card.combined_image.clone(), now)?;
        for location in &card.locations {
            created.push_location(location.clone(), now);
        }

        tx.execute(
            "INSERT INTO cards (
                id,
                name,
                combined_image,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                created.id,
                created.name.as_str(),
                created.combined_image.as_slice(),
                created.created_at,
                created.updated_at,
            ],
        )?;
        for (position, location) in created.locations.iter().enumerate() {
            insert_location_row(&tx, created.id, position, location)?;
        }

        tx.commit()?;
        Ok(id)
    }

    fn get_card(&self, id: CardId) -> RepoResult<Option<Card>> {
        load_card(self.conn, id)
    }

    fn list_cards(&self) -> RepoResult<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut cards = Vec::new();
        let mut index_by_id = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let card = parse_card_row(row)?;
            index_by_id.insert(card.id, cards.len());
            cards.push(card);
        }

        let mut stmt = self.conn.prepare(&format!(
            "{LOCATION_SELECT_SQL} ORDER BY card_id ASC, position ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let card_id: CardId = row.get("card_id")?;
            let card_index = *index_by_id.get(&card_id).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "location row references unknown card {card_id}"
                ))
            })?;
            let card = &mut cards[card_index];
            let location = parse_location_row(row, card.locations.len())?;
            card.locations.push(location);
        }

        for card in &cards {
            card.validate().map_err(|err| invalid_card(card.id, err))?;
        }
        Ok(cards)
    }

    fn delete_card(&self, id: CardId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn rename_card(&self, id: CardId, name: &str) -> RepoResult<Card> {
        validate_card_name(name)?;

        let tx = self.begin_write()?;
        let mut card = load_card(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        card.rename(name, now_epoch_ms())?;

        tx.execute(
            "UPDATE cards
             SET
                name = ?2,
                updated_at = ?3
             WHERE id = ?1;",
            params![card.id, card.name.as_str(), card.updated_at],
        )?;

        tx.commit()?;
        Ok(card)
    }

    fn add_location(&self, id: CardId, location: NewLocation) -> RepoResult<LocationUpdate> {
        let tx = self.begin_write()?;
        let mut card = load_card(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        let change = card.push_location(location, now_epoch_ms());
        if let LocationChange::Added(position) = change {
            insert_location_row(&tx, card.id, position, &card.locations[position])?;
            touch_card(&tx, &card)?;
        }

        tx.commit()?;
        Ok(LocationUpdate { card, change })
    }

    fn remove_location(&self, id: CardId, index: usize) -> RepoResult<LocationUpdate> {
        let tx = self.begin_write()?;
        let mut card = load_card(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        let change = card.remove_location(index, now_epoch_ms());
        if change.is_change() {
            let position = position_to_db(index)?;
            tx.execute(
                "DELETE FROM card_locations
                 WHERE card_id = ?1
                   AND position = ?2;",
                params![card.id, position],
            )?;
            tx.execute(
                "UPDATE card_locations
                 SET position = position - 1
                 WHERE card_id = ?1
                   AND position > ?2;",
                params![card.id, position],
            )?;
            touch_card(&tx, &card)?;
        }

        tx.commit()?;
        Ok(LocationUpdate { card, change })
    }
}

fn load_card(conn: &Connection, id: CardId) -> RepoResult<Option<Card>> {
    let mut stmt = conn.prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut card = parse_card_row(row)?;

    let mut stmt = conn.prepare(&format!(
        "{LOCATION_SELECT_SQL} WHERE card_id = ?1 ORDER BY position ASC;"
    ))?;
    let mut rows = stmt.query([id])?;
    while let Some(row) = rows.next()? {
        let location = parse_location_row(row, card.locations.len())?;
        card.locations.push(location);
    }

    card.validate().map_err(|err| invalid_card(card.id, err))?;
    Ok(Some(card))
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<Card> {
    Ok(Card {
        id: row.get("id")?,
        name: row.get("name")?,
        combined_image: row.get("combined_image")?,
        locations: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_location_row(row: &Row<'_>, expected_position: usize) -> RepoResult<Location> {
    let position: i64 = row.get("position")?;
    if usize::try_from(position).ok() != Some(expected_position) {
        let card_id: CardId = row.get("card_id")?;
        return Err(RepoError::InvalidData(format!(
            "card {card_id} has location position {position}, expected {expected_position}"
        )));
    }

    Ok(Location {
        lat: row.get("lat")?,
        lng: row.get("lng")?,
        name: row.get("name")?,
        added_at: row.get("added_at")?,
    })
}

fn insert_location_row(
    tx: &Transaction<'_>,
    card_id: CardId,
    position: usize,
    location: &Location,
) -> RepoResult<()> {
    tx.execute(
        "INSERT INTO card_locations (
            card_id,
            position,
            lat,
            lng,
            name,
            added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            card_id,
            position_to_db(position)?,
            location.lat,
            location.lng,
            location.name.as_str(),
            location.added_at,
        ],
    )?;
    Ok(())
}

fn touch_card(tx: &Transaction<'_>, card: &Card) -> RepoResult<()> {
    tx.execute(
        "UPDATE cards SET updated_at = ?2 WHERE id = ?1;",
        params![card.id, card.updated_at],
    )?;
    Ok(())
}

fn take_next_card_id(tx: &Transaction<'_>) -> RepoResult<CardId> {
    let next: CardId = tx
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1;",
            [NEXT_CARD_ID_KEY],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| RepoError::InvalidData("store_meta.next_card_id is missing".to_string()))?;

    if next <= 0 {
        return Err(RepoError::InvalidData(format!(
            "store_meta.next_card_id must be positive, got {next}"
        )));
    }

    tx.execute(
        "UPDATE store_meta SET value = ?2 WHERE key = ?1;",
        params![NEXT_CARD_ID_KEY, next + 1],
    )?;
    Ok(next)
}

fn position_to_db(position: usize) -> RepoResult<i64> {
    i64::try_from(position)
        .map_err(|_| RepoError::InvalidData(format!("location position {position} overflows")))
}

fn invalid_card(id: CardId, err: CardValidationError) -> RepoError {
    RepoError::InvalidData(format!("card {id}: {err}"))
}

fn ensure_card_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 3] = [
        ("store_meta", &["key", "value"]),
        (
            "cards",
            &["id", "name", "combined_image", "created_at", "updated_at"],
        ),
        (
            "card_locations",
            &["card_id", "position", "lat", "lng", "name", "added_at"],
        ),
    ];

    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in columns.iter().copied() {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

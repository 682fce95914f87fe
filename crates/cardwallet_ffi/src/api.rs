//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose card wallet use-cases to Dart via FRB.
//! - Validate caller-supplied position samples before they reach the core.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported through `ok=false` envelopes with a message.

use cardwallet_core::db::open_db;
use cardwallet_core::{
    core_version as core_version_inner, format_distance, init_logging as init_logging_inner,
    ping as ping_inner, Card, CardService, Coordinate, Location, LocationChange, NewLocation,
    Recommendation, RecommendService, RepoResult, SqliteCardRepository,
    DEFAULT_RECOMMENDATION_LIMIT,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const RECOMMEND_LIMIT_MAX: u32 = 20;
const WALLET_DB_FILE_NAME: &str = "cardwallet.sqlite3";
static WALLET_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and an error message otherwise.
/// Repeating the call with the same `level + log_dir` is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One stored location as shown in the card detail screen.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationView {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    /// Unix epoch milliseconds.
    pub added_at: i64,
}

/// Card projection returned to Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub card_id: i64,
    pub name: String,
    pub combined_image: Vec<u8>,
    /// Ordered as stored; the index is the removal index.
    pub locations: Vec<LocationView>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Envelope for create/rename/delete calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardActionResponse {
    pub ok: bool,
    pub card_id: Option<i64>,
    pub message: String,
}

impl CardActionResponse {
    fn success(message: impl Into<String>, card_id: i64) -> Self {
        Self {
            ok: true,
            card_id: Some(card_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            card_id: None,
            message: message.into(),
        }
    }
}

/// Envelope for single-card reads.
#[derive(Debug, Clone, PartialEq)]
pub struct CardDetailResponse {
    pub ok: bool,
    /// `None` when the card does not exist or the read failed.
    pub card: Option<CardView>,
    pub message: String,
}

/// Envelope for the card list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct CardListResponse {
    pub ok: bool,
    pub items: Vec<CardView>,
    pub message: String,
}

/// Envelope for location add/remove calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationActionResponse {
    pub ok: bool,
    /// `false` for soft no-ops (duplicate point, missing index).
    pub changed: bool,
    pub location_count: u32,
    pub message: String,
}

impl LocationActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changed: false,
            location_count: 0,
            message: message.into(),
        }
    }
}

/// One ranked card for the "nearby" strip.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendItem {
    pub card_id: i64,
    pub name: String,
    pub combined_image: Vec<u8>,
    pub nearest_distance_m: f64,
    /// Display label such as `350m` or `1.2km`.
    pub distance_label: String,
    pub nearest_location_name: String,
    pub score: u8,
    pub is_nearby: bool,
}

/// Envelope for recommendation calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendResponse {
    pub ok: bool,
    pub items: Vec<RecommendItem>,
    pub message: String,
    pub applied_limit: u32,
}

/// Registers a card, optionally pinned to the current position.
///
/// An out-of-range or partial position still saves the card, without a
/// location, and says so in `message`.
#[flutter_rust_bridge::frb(sync)]
pub fn card_add(
    name: String,
    combined_image: Vec<u8>,
    lat: Option<f64>,
    lng: Option<f64>,
    location_name: Option<String>,
) -> CardActionResponse {
    let (initial_locations, location_note) = match (lat, lng) {
        (None, None) => (Vec::new(), ""),
        (Some(lat), Some(lng)) if Coordinate::new(lat, lng).is_within_bounds() => (
            vec![NewLocation {
                lat,
                lng,
                name: location_name,
            }],
            "",
        ),
        _ => (Vec::new(), " Position ignored: out of range or incomplete."),
    };

    match with_card_service(|service| service.add_card(name, combined_image, initial_locations)) {
        Ok(card_id) => CardActionResponse::success(format!("Card saved.{location_note}"), card_id),
        Err(err) => CardActionResponse::failure(format!("card_add failed: {err}")),
    }
}

/// Reads one card by id.
#[flutter_rust_bridge::frb(sync)]
pub fn card_get(card_id: i64) -> CardDetailResponse {
    match with_card_service(|service| service.get_card(card_id)) {
        Ok(Some(card)) => CardDetailResponse {
            ok: true,
            card: Some(to_card_view(card)),
            message: String::new(),
        },
        Ok(None) => CardDetailResponse {
            ok: false,
            card: None,
            message: format!("card not found: {card_id}"),
        },
        Err(err) => CardDetailResponse {
            ok: false,
            card: None,
            message: format!("card_get failed: {err}"),
        },
    }
}

/// Lists every stored card in id order.
#[flutter_rust_bridge::frb(sync)]
pub fn card_list() -> CardListResponse {
    match with_card_service(|service| service.list_cards()) {
        Ok(cards) => {
            let items = cards.into_iter().map(to_card_view).collect::<Vec<_>>();
            CardListResponse {
                ok: true,
                message: format!("{} card(s).", items.len()),
                items,
            }
        }
        Err(err) => CardListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("card_list failed: {err}"),
        },
    }
}

/// Permanently deletes a card.
#[flutter_rust_bridge::frb(sync)]
pub fn card_delete(card_id: i64) -> CardActionResponse {
    match with_card_service(|service| service.delete_card(card_id)) {
        Ok(()) => CardActionResponse::success("Card deleted.", card_id),
        Err(err) => CardActionResponse::failure(format!("card_delete failed: {err}")),
    }
}

/// Renames a card.
#[flutter_rust_bridge::frb(sync)]
pub fn card_rename(card_id: i64, name: String) -> CardActionResponse {
    match with_card_service(|service| service.rename_card(card_id, name.as_str())) {
        Ok(card) => CardActionResponse::success("Card renamed.", card.id),
        Err(err) => CardActionResponse::failure(format!("card_rename failed: {err}")),
    }
}

/// Attaches the current position to a card.
///
/// Points within 50 m of an existing location succeed with `changed=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn card_add_location(
    card_id: i64,
    lat: f64,
    lng: f64,
    name: Option<String>,
) -> LocationActionResponse {
    if !Coordinate::new(lat, lng).is_within_bounds() {
        return LocationActionResponse::failure(format!(
            "card_add_location failed: position ({lat}, {lng}) is out of range"
        ));
    }

    match with_card_service(|service| service.add_location_to_card(card_id, lat, lng, name)) {
        Ok(update) => location_response(&update.card, &update.change),
        Err(err) => LocationActionResponse::failure(format!("card_add_location failed: {err}")),
    }
}

/// Removes the location at `index` from a card.
///
/// A missing index succeeds with `changed=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn card_remove_location(card_id: i64, index: u32) -> LocationActionResponse {
    let index = index as usize;
    match with_card_service(|service| service.remove_location_from_card(card_id, index)) {
        Ok(update) => location_response(&update.card, &update.change),
        Err(err) => {
            LocationActionResponse::failure(format!("card_remove_location failed: {err}"))
        }
    }
}

/// Ranks stored cards around a single position sample.
///
/// A missing or out-of-range position yields an empty list with `ok=true`.
/// `limit=None` means the default of 4; `Some(0)` yields an empty list.
#[flutter_rust_bridge::frb(sync)]
pub fn cards_recommend(lat: Option<f64>, lng: Option<f64>, limit: Option<u32>) -> RecommendResponse {
    let applied_limit = normalize_recommend_limit(limit);
    let position = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        _ => None,
    }
    .filter(Coordinate::is_within_bounds);

    let ranked = with_wallet_repo(|repo| {
        RecommendService::new(repo).recommend(position, applied_limit as usize)
    });
    match ranked {
        Ok(ranked) => {
            let items = ranked.into_iter().map(to_recommend_item).collect::<Vec<_>>();
            let message = if position.is_none() {
                "No position available.".to_string()
            } else if items.is_empty() {
                "No cards with locations.".to_string()
            } else {
                format!("Found {} card(s).", items.len())
            };
            RecommendResponse {
                ok: true,
                items,
                message,
                applied_limit,
            }
        }
        Err(err) => RecommendResponse {
            ok: false,
            items: Vec::new(),
            message: format!("cards_recommend failed: {err}"),
            applied_limit,
        },
    }
}

fn normalize_recommend_limit(limit: Option<u32>) -> u32 {
    match limit {
        None => DEFAULT_RECOMMENDATION_LIMIT as u32,
        Some(value) => value.min(RECOMMEND_LIMIT_MAX),
    }
}

fn resolve_wallet_db_path() -> PathBuf {
    WALLET_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("CARDWALLET_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(WALLET_DB_FILE_NAME)
        })
        .clone()
}

fn with_wallet_repo<T>(
    f: impl FnOnce(SqliteCardRepository<'_>) -> RepoResult<T>,
) -> Result<T, String> {
    let db_path = resolve_wallet_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("wallet DB open failed: {err}"))?;
    let repo = SqliteCardRepository::try_new(&conn)
        .map_err(|err| format!("wallet repo init failed: {err}"))?;
    f(repo).map_err(|err| {
        if err.is_storage_failure() {
            warn!("event=ffi_call module=ffi status=error error_code=storage_failure error={err}");
        }
        err.to_string()
    })
}

fn with_card_service<T>(
    f: impl FnOnce(&CardService<SqliteCardRepository<'_>>) -> RepoResult<T>,
) -> Result<T, String> {
    with_wallet_repo(|repo| f(&CardService::new(repo)))
}

fn location_response(card: &Card, change: &LocationChange) -> LocationActionResponse {
    let message = match change {
        LocationChange::Added(_) => "Location added.",
        LocationChange::Duplicate => "Location already registered nearby.",
        LocationChange::Removed(_) => "Location removed.",
        LocationChange::IndexOutOfRange => "Location index not found.",
    };
    LocationActionResponse {
        ok: true,
        changed: change.is_change(),
        location_count: u32::try_from(card.location_count()).unwrap_or(u32::MAX),
        message: message.to_string(),
    }
}

fn to_location_view(location: Location) -> LocationView {
    LocationView {
        lat: location.lat,
        lng: location.lng,
        name: location.name,
        added_at: location.added_at,
    }
}

fn to_card_view(card: Card) -> CardView {
    CardView {
        card_id: card.id,
        name: card.name,
        combined_image: card.combined_image,
        locations: card.locations.into_iter().map(to_location_view).collect(),
        created_at: card.created_at,
        updated_at: card.updated_at,
    }
}

fn to_recommend_item(recommendation: Recommendation) -> RecommendItem {
    let score = recommendation.score();
    let is_nearby = recommendation.is_nearby();
    RecommendItem {
        card_id: recommendation.card.id,
        name: recommendation.card.name,
        combined_image: recommendation.card.combined_image,
        nearest_distance_m: recommendation.nearest_distance,
        distance_label: format_distance(recommendation.nearest_distance),
        nearest_location_name: recommendation.nearest_location.name,
        score,
        is_nearby,
    }
}

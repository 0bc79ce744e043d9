//! FFI cart API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the cart command surface (add/remove/remove item/clear) and the
//!   read model to Dart via FRB.
//! - Keep error semantics simple: every call returns a `CartResponse`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Each call opens the cart from durable storage, applies one command and
//!   returns the resulting read model. No cart state lives in statics.
//! - Hiding the notification is a UI concern; responses carry it as data.
//! - A command whose result could not be written back reports `ok = false`,
//!   since the store holding it is dropped when the call returns.

use cartstore_core::db::open_db;
use cartstore_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CartItem, CartStore, ItemId, NotificationState, SqliteKeyValueStore, NOTIFICATION_AUTO_HIDE,
};
use log::warn;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const CART_DB_FILE_NAME: &str = "cartstore.sqlite3";
const CART_DB_PATH_ENV: &str = "CARTSTORE_DB_PATH";
static CART_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
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
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Item identity as seen by Dart: numeric and string ids stay distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartItemIdInput {
    Int(i64),
    Text(String),
}

impl From<CartItemIdInput> for ItemId {
    fn from(value: CartItemIdInput) -> Self {
        match value {
            CartItemIdInput::Int(id) => ItemId::Int(id),
            CartItemIdInput::Text(id) => ItemId::Text(id),
        }
    }
}

impl From<&ItemId> for CartItemIdInput {
    fn from(value: &ItemId) -> Self {
        match value {
            ItemId::Int(id) => Self::Int(*id),
            ItemId::Text(id) => Self::Text(id.clone()),
        }
    }
}

/// One cart line for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineView {
    pub id: CartItemIdInput,
    pub price: f64,
    pub quantity: u32,
    /// Opaque descriptive fields as a JSON object string.
    pub attributes_json: String,
}

/// Toast signal for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub visible: bool,
    /// `add` or `delete`.
    pub message_type: String,
    pub message: String,
    /// Suggested auto-hide delay.
    pub auto_hide_ms: u32,
}

/// Read model returned by every cart call.
#[derive(Debug, Clone, PartialEq)]
pub struct CartResponse {
    /// Whether the command was applied and saved.
    pub ok: bool,
    pub items: Vec<CartLineView>,
    /// Distinct entries, not units.
    pub items_count: u32,
    pub total: f64,
    pub notification: NotificationView,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

impl CartResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            items: Vec::new(),
            items_count: 0,
            total: 0.0,
            notification: to_notification_view(NotificationState::default()),
            message: message.into(),
        }
    }
}

/// Returns the persisted cart without changing it.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_get() -> CartResponse {
    cart_get_at(&resolve_cart_db_path())
}

/// Adds one unit of an item, merging by id.
///
/// `price` must be finite. `attributes_json`, when set, must be a JSON
/// object of descriptive fields (`name`, `image`, ...). Reserved keys
/// (`id`, `price`, `quantity`) inside it are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_add(id: CartItemIdInput, price: f64, attributes_json: Option<String>) -> CartResponse {
    cart_add_at(&resolve_cart_db_path(), id, price, attributes_json)
}

/// Removes one unit of an item; the line disappears at zero.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_remove(id: CartItemIdInput) -> CartResponse {
    cart_remove_at(&resolve_cart_db_path(), id)
}

/// Removes a line entirely, whatever its quantity.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_remove_item(id: CartItemIdInput) -> CartResponse {
    cart_remove_item_at(&resolve_cart_db_path(), id)
}

/// Empties the cart.
#[flutter_rust_bridge::frb(sync)]
pub fn cart_clear() -> CartResponse {
    cart_clear_at(&resolve_cart_db_path())
}

fn cart_get_at(db_path: &Path) -> CartResponse {
    with_cart_store(db_path, "cart_get", |_| "Cart loaded.")
}

fn cart_add_at(
    db_path: &Path,
    id: CartItemIdInput,
    price: f64,
    attributes_json: Option<String>,
) -> CartResponse {
    let attributes = match parse_attributes(attributes_json.as_deref()) {
        Ok(attributes) => attributes,
        Err(err) => return CartResponse::failure(format!("cart_add failed: {err}")),
    };
    let item = attributes
        .into_iter()
        .fold(CartItem::new(ItemId::from(id), price), |item, (key, value)| {
            item.with_attribute(key, value)
        });
    if !item.has_finite_price() {
        return CartResponse::failure(format!("cart_add failed: price `{price}` is not finite"));
    }

    with_cart_store(db_path, "cart_add", |store| {
        store.add_to_cart(&item);
        "Item added to cart."
    })
}

fn cart_remove_at(db_path: &Path, id: CartItemIdInput) -> CartResponse {
    let id = ItemId::from(id);
    with_cart_store(db_path, "cart_remove", |store| {
        store.remove_from_cart(&id);
        "Item removed from cart."
    })
}

fn cart_remove_item_at(db_path: &Path, id: CartItemIdInput) -> CartResponse {
    let id = ItemId::from(id);
    with_cart_store(db_path, "cart_remove_item", |store| {
        store.remove_item_from_cart(&id);
        "Item removed from cart."
    })
}

fn cart_clear_at(db_path: &Path) -> CartResponse {
    with_cart_store(db_path, "cart_clear", |store| {
        store.clear_cart();
        "Cart cleared."
    })
}

fn parse_attributes(raw: Option<&str>) -> Result<Map<String, Value>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("attributes_json must be a JSON object".to_string()),
        Err(err) => Err(format!("invalid attributes_json: {err}")),
    }
}

fn resolve_cart_db_path() -> PathBuf {
    CART_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(CART_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(CART_DB_FILE_NAME)
        })
        .clone()
}

fn with_cart_store(
    db_path: &Path,
    operation: &str,
    f: impl FnOnce(&mut CartStore<SqliteKeyValueStore<'_>>) -> &'static str,
) -> CartResponse {
    let conn = match open_db(db_path) {
        Ok(conn) => conn,
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op={operation} error_code=db_open_failed");
            return CartResponse::failure(format!("{operation} failed: cart DB open failed: {err}"));
        }
    };
    let kv = match SqliteKeyValueStore::try_new(&conn) {
        Ok(kv) => kv,
        Err(err) => {
            return CartResponse::failure(format!("{operation} failed: cart store init failed: {err}"));
        }
    };

    let mut store = CartStore::open(kv);
    let message = f(&mut store);
    match store.last_persist_error() {
        Some(err) => {
            warn!("event=ffi_call module=ffi status=error op={operation} error_code=persist_failed");
            let message = format!("{operation} failed: change was not saved: {err}");
            to_response(&store, false, &message)
        }
        None => to_response(&store, true, message),
    }
}

fn to_response(
    store: &CartStore<SqliteKeyValueStore<'_>>,
    ok: bool,
    message: &str,
) -> CartResponse {
    let snapshot = store.snapshot();
    CartResponse {
        ok,
        items: snapshot.items.iter().map(to_line_view).collect(),
        items_count: u32::try_from(snapshot.items_count).unwrap_or(u32::MAX),
        total: snapshot.total,
        notification: to_notification_view(snapshot.notification),
        message: message.to_string(),
    }
}

fn to_line_view(item: &CartItem) -> CartLineView {
    CartLineView {
        id: CartItemIdInput::from(&item.id),
        price: item.price,
        quantity: item.quantity,
        attributes_json: Value::Object(item.attributes.clone()).to_string(),
    }
}

fn to_notification_view(state: NotificationState) -> NotificationView {
    NotificationView {
        visible: state.visible,
        message_type: state.kind.as_str().to_string(),
        message: state.kind.message().to_string(),
        auto_hide_ms: u32::try_from(NOTIFICATION_AUTO_HIDE.as_millis()).unwrap_or(u32::MAX),
    }
}

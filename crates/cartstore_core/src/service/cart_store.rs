//! Cart store: the single owner of cart state.
//!
//! # Responsibility
//! - Hydrate the cart from durable storage once, at construction.
//! - Apply cart mutations and mirror the whole cart back after each one.
//! - Raise the notification signal and fan out snapshots to subscribers.
//!
//! # Invariants
//! - Cart contents change only through the named mutators.
//! - Storage failures never abort a mutation; memory stays authoritative and
//!   the failure is kept for `last_persist_error` until the next good write.
//! - Removing an unknown id is a no-op on contents but still notifies.
//! - `clear_cart` leaves the notification signal untouched.

use crate::model::cart::{Cart, SnapshotError};
use crate::model::item::{CartItem, ItemId};
use crate::model::notification::{NotificationKind, NotificationState};
use crate::repo::kv_store::{KeyValueStore, KvError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key the cart snapshot lives under by default.
pub const DEFAULT_STORAGE_KEY: &str = "cartItems";

/// Store construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartStoreConfig {
    /// Key used for the JSON snapshot in the key-value store.
    pub storage_key: String,
}

impl Default for CartStoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Owned read model handed to subscribers and UI callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    /// Distinct entries, not units.
    pub items_count: usize,
    pub total: f64,
    pub total_quantity: u64,
    pub notification: NotificationState,
}

/// Why the last write-back of the cart did not reach storage.
#[derive(Debug)]
pub enum PersistError {
    Encode(SnapshotError),
    Write(KvError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "cart snapshot write failed: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Write(err) => Some(err),
        }
    }
}

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&CartSnapshot)>;

/// Cart state container backed by a durable key-value store.
pub struct CartStore<S: KeyValueStore> {
    storage: S,
    config: CartStoreConfig,
    cart: Cart,
    notification: NotificationState,
    last_persist_error: Option<PersistError>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Opens a store with the default storage key.
    pub fn open(storage: S) -> Self {
        Self::open_with_config(storage, CartStoreConfig::default())
    }

    /// Opens a store and hydrates the cart from `storage`.
    ///
    /// Never fails: a missing, unreadable or malformed snapshot yields an
    /// empty cart.
    pub fn open_with_config(storage: S, config: CartStoreConfig) -> Self {
        let cart = load_cart(&storage, &config.storage_key);
        Self {
            storage,
            config,
            cart,
            notification: NotificationState::default(),
            last_persist_error: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current line items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    pub fn notification(&self) -> NotificationState {
        self.notification
    }

    /// Failure of the most recent write-back, `None` after a good one.
    ///
    /// Front ends that drop the store after one command use this to tell
    /// the caller their change was not saved.
    pub fn last_persist_error(&self) -> Option<&PersistError> {
        self.last_persist_error.as_ref()
    }

    /// Sum of `price * quantity`; `0.0` for an empty cart.
    pub fn cart_total(&self) -> f64 {
        self.cart.total()
    }

    /// Number of distinct entries.
    pub fn cart_items_count(&self) -> usize {
        self.cart.len()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.cart.items().to_vec(),
            items_count: self.cart.len(),
            total: self.cart.total(),
            total_quantity: self.cart.total_quantity(),
            notification: self.notification,
        }
    }

    /// Adds one unit of `item`, merging by id.
    ///
    /// A new item with a non-finite price is refused: nothing is persisted
    /// and no notification is raised.
    pub fn add_to_cart(&mut self, item: &CartItem) -> &[CartItem] {
        if !self.cart.add(item) {
            warn!(
                "event=cart_add module=store status=rejected item_id={} error_code=non_finite_price",
                item.id
            );
            return self.cart.items();
        }
        debug!(
            "event=cart_add module=store status=ok item_id={} items_count={}",
            item.id,
            self.cart.len()
        );
        self.commit("cart_add", Some(NotificationKind::Added));
        self.cart.items()
    }

    /// Removes one unit of the item with `id`; the entry disappears at zero.
    pub fn remove_from_cart(&mut self, id: &ItemId) -> &[CartItem] {
        let matched = self.cart.decrement(id);
        debug!(
            "event=cart_remove module=store status=ok item_id={id} matched={matched} items_count={}",
            self.cart.len()
        );
        self.commit("cart_remove", Some(NotificationKind::Removed));
        self.cart.items()
    }

    /// Removes the item with `id` whatever its quantity.
    pub fn remove_item_from_cart(&mut self, id: &ItemId) -> &[CartItem] {
        let matched = self.cart.remove(id);
        debug!(
            "event=cart_remove_item module=store status=ok item_id={id} matched={matched} items_count={}",
            self.cart.len()
        );
        self.commit("cart_remove_item", Some(NotificationKind::Removed));
        self.cart.items()
    }

    /// Empties the cart and persists the empty collection.
    pub fn clear_cart(&mut self) -> &[CartItem] {
        self.cart.clear();
        debug!("event=cart_clear module=store status=ok");
        self.commit("cart_clear", None);
        self.cart.items()
    }

    /// Hides the notification. Cart contents and storage are untouched.
    pub fn dismiss_notification(&mut self) {
        self.notification.dismiss();
        self.publish();
    }

    /// Registers a listener called with a fresh snapshot after every
    /// mutation and every dismissal, in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&CartSnapshot) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drops a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn commit(&mut self, event: &'static str, notify: Option<NotificationKind>) {
        self.persist(event);
        if let Some(kind) = notify {
            self.notification = NotificationState::raised(kind);
        }
        self.publish();
    }

    fn persist(&mut self, event: &'static str) {
        self.last_persist_error = match self.write_snapshot() {
            Ok(bytes) => {
                debug!("event=cart_persist module=store status=ok cause={event} bytes={bytes}");
                None
            }
            Err(err) => {
                let error_code = match err {
                    PersistError::Encode(_) => "encode_failed",
                    PersistError::Write(_) => "write_failed",
                };
                error!(
                    "event=cart_persist module=store status=error cause={event} error_code={error_code} error={err}"
                );
                Some(err)
            }
        };
    }

    fn write_snapshot(&self) -> Result<usize, PersistError> {
        let encoded = self.cart.encode_snapshot().map_err(PersistError::Encode)?;
        self.storage
            .set(&self.config.storage_key, &encoded)
            .map_err(PersistError::Write)?;
        Ok(encoded.len())
    }

    fn publish(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

fn load_cart<S: KeyValueStore>(storage: &S, key: &str) -> Cart {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!("event=cart_load module=store status=ok source=empty");
            return Cart::new();
        }
        Err(err) => {
            error!(
                "event=cart_load module=store status=error error_code=read_failed error={err}"
            );
            return Cart::new();
        }
    };

    match Cart::decode_snapshot(&raw) {
        Ok((cart, report)) => {
            if !report.is_clean() {
                warn!(
                    "event=cart_load module=store status=repaired dropped_empty={} merged_duplicates={}",
                    report.dropped_empty, report.merged_duplicates
                );
            }
            info!(
                "event=cart_load module=store status=ok source=snapshot items_count={}",
                cart.len()
            );
            cart
        }
        Err(err) => {
            warn!(
                "event=cart_load module=store status=fallback error_code=decode_failed error={err}"
            );
            Cart::new()
        }
    }
}

//! Core cart state for cartstore.
//! This crate is the single source of truth for cart invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::cart::{Cart, ReconcileReport, SnapshotError};
pub use model::item::{CartItem, ItemId};
pub use model::notification::{NotificationKind, NotificationState, NOTIFICATION_AUTO_HIDE};
pub use repo::kv_store::{KeyValueStore, KvError, KvResult, SqliteKeyValueStore};
pub use service::cart_store::{
    CartSnapshot, CartStore, CartStoreConfig, PersistError, SubscriptionId, DEFAULT_STORAGE_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

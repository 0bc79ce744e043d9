//! Flutter-facing bridge over `cartstore_core`.

pub mod api;

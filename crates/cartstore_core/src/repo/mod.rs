//! Persistence abstractions and implementations.
//!
//! # Responsibility
//! - Define the durable key-value contract the cart store writes through.
//! - Isolate SQLite query details from the store.
//!
//! # Invariants
//! - Storage only sees opaque strings; cart encoding lives in `model::cart`.

pub mod kv_store;

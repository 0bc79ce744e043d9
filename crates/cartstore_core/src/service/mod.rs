//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate cart rules, persistence and notification into one owner.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod cart_store;

//! Neon Merch Core - Shared domain types.
//!
//! This crate provides the types used by the storefront and its tests:
//! - Products as served by the backend API
//! - The visitor cart and its persisted form
//! - Checkout requests, outcomes, and the per-attempt purchase state machine
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session access. Persistence and network calls live in the
//! storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, products, cart, and checkout types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

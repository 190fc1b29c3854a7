//! GoMarket Core - Shared cart types library.
//!
//! This crate provides the domain types used by the GoMarket cart:
//! - `gomarket-cart` - Persisted cart store consumed by UI components
//! - `integration-tests` - End-to-end checks of the store against storage backends
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs and prices, cart line items, and
//!   the store lifecycle status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

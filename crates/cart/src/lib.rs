//! GoMarket Cart - Persisted shopping-cart store.
//!
//! Holds the cart lines of the mobile storefront in memory, lets UI components
//! read and change them through a shared [`CartStore`] handle, and mirrors every
//! change to device key-value storage so the cart survives restarts.
//!
//! # Architecture
//!
//! - [`store`] - `CartStore`: lifecycle, cart operations, subscriptions
//! - [`persist`] - Background writer that applies snapshots to storage in order
//! - [`storage`] - `KeyValueStore` trait with in-memory and file backends
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error types
//!
//! The cart is stored as one JSON array under a single key (default
//! `cart:products`):
//!
//! ```json
//! [{"id":"p1","title":"Shirt","image_url":"http://...","price":29.9,"quantity":2}]
//! ```
//!
//! # Logging
//!
//! The crate emits `tracing` events and spans but never installs a subscriber;
//! that is left to the embedding application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod persist;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, DEFAULT_STORAGE_KEY};
pub use error::{CartError, Result, StorageError};
pub use persist::PersistenceStats;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{CartStore, Subscriber, SubscriptionId};

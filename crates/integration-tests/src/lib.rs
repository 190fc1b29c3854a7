//! Integration tests for the GoMarket cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gomarket-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_operations` - Cart operations and lifecycle against in-memory storage
//! - `cart_persistence` - Hydration, write ordering, and failure handling
//!
//! This library holds the shared fixtures and storage test doubles.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gomarket_cart::{
    CartConfig, CartStore, KeyValueStore, MemoryStore, Result as CartResult, StorageError,
};
use gomarket_core::{NewCartItem, Price, ProductId};

/// Build a new cart item with a placeholder title and image.
///
/// # Panics
///
/// Panics if `id` is blank or `price` is not a non-negative decimal.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn new_item(id: &str, price: &str) -> NewCartItem {
    NewCartItem::new(
        ProductId::parse(id).unwrap(),
        format!("Product {id}"),
        format!("http://img.example/{id}.png"),
        price.parse::<Price>().unwrap(),
    )
}

/// Create and initialize a store over `storage` with the default config.
///
/// # Errors
///
/// Returns any error from construction or initialization.
pub async fn ready_store<S: KeyValueStore>(storage: Arc<S>) -> CartResult<CartStore<S>> {
    let store = CartStore::new(storage, CartConfig::default())?;
    store.initialize().await?;
    Ok(store)
}

/// Storage that records every write, optionally slowing each one down.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<String>>,
    write_delay: Option<Duration>,
}

impl RecordingStore {
    /// Create an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every write, like a slow device.
    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Payloads written so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current value for `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.value(key)
    }
}

impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value.clone());
        self.inner.set(key, value).await
    }
}

/// Storage whose reads and/or writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingStore {
    /// Reads succeed (and find nothing); writes fail.
    #[must_use]
    pub const fn failing_writes() -> Self {
        Self {
            fail_reads: false,
            fail_writes: true,
        }
    }

    /// Reads fail; writes succeed.
    #[must_use]
    pub const fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            fail_writes: false,
        }
    }
}

impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable("device storage locked".to_string()));
        }
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("device storage full".to_string()));
        }
        Ok(())
    }
}

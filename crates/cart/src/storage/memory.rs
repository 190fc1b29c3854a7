use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::KeyValueStore;
use crate::error::StorageError;

/// In-memory key-value store.
///
/// Values live as long as the store does. Cloning is not supported; share it
/// behind an `Arc` to inspect what the cart wrote.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.insert(key, value);
        store
    }

    /// Insert a value without going through the async interface.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Read a value without going through the async interface.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }
}

//! Key-value storage backends for the persisted cart.
//!
//! The cart is stored as a single JSON blob under one key, so a backend only
//! needs whole-value reads and overwrites. There are no partial updates and no
//! transactions.
//!
//! - [`MemoryStore`] - In-process map, for tests and ephemeral carts
//! - [`FileStore`] - One file per key in a directory on the device

mod file;
mod memory;

use std::future::Future;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;

/// Asynchronous string key-value storage.
///
/// Implementations must be safe to share between the store and its
/// background writer task.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Overwrite the value stored under `key`.
    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

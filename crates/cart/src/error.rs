//! Error types for the cart store.

use gomarket_core::CartStatus;
use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::storage::KeyValueStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem or device I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests right now.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A value is stored but cannot be decoded as text.
    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Cart store error type.
#[derive(Debug, Error)]
pub enum CartError {
    /// The store was used outside its active lifetime, or set up incorrectly.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reading from the key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The background persistence writer is no longer running.
    #[error("Persistence writer stopped")]
    WriterStopped,
}

impl CartError {
    /// Error for a cart operation attempted while the store is not `Ready`.
    #[must_use]
    pub fn outside_scope(status: CartStatus) -> Self {
        Self::Configuration(format!(
            "cart operations used outside provider scope (store is {status})"
        ))
    }

    /// Whether this is a [`CartError::Configuration`] error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_scope_message() {
        let err = CartError::outside_scope(CartStatus::Loading);
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: cart operations used outside provider scope (store is loading)"
        );
    }

    #[test]
    fn test_storage_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CartError::from(StorageError::from(io));
        assert!(matches!(err, CartError::Storage(StorageError::Io(_))));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_corrupt_message() {
        let err = StorageError::Corrupt("invalid UTF-8".to_string());
        assert_eq!(err.to_string(), "Stored value is corrupt: invalid UTF-8");
    }
}

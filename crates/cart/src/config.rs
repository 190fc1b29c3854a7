//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE_KEY` - Key the cart is persisted under (default: `cart:products`)
//! - `CART_STORAGE_DIR` - Directory for the file-backed store; unset means the
//!   embedding app supplies its own storage backend

use std::path::PathBuf;

use thiserror::Error;

/// Default key the cart is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "cart:products";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Key the serialized cart is stored under
    pub storage_key: String,
    /// Directory for [`FileStore`](crate::storage::FileStore), if file-backed
    pub storage_dir: Option<PathBuf>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_dir: None,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_key = match lookup("CART_STORAGE_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::InvalidEnvVar(
                    "CART_STORAGE_KEY".to_string(),
                    "must not be empty".to_string(),
                ));
            }
            Some(key) => key,
            None => DEFAULT_STORAGE_KEY.to_string(),
        };

        let storage_dir = match lookup("CART_STORAGE_DIR") {
            Some(dir) if dir.trim().is_empty() => {
                return Err(ConfigError::InvalidEnvVar(
                    "CART_STORAGE_DIR".to_string(),
                    "must not be empty".to_string(),
                ));
            }
            Some(dir) => Some(PathBuf::from(dir)),
            None => None,
        };

        Ok(Self {
            storage_key,
            storage_dir,
        })
    }

    /// Use a different storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Use a file-backed store rooted at `dir`.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }
}

//! Key/value storage for client-side state.
//!
//! The storefront keeps its guest state (session id, wishlist, auth tokens)
//! in a flat string-to-string store, the same shape as a browser's local
//! storage. Implementations:
//!
//! - [`MemoryStorage`]: process-local, for tests and embedding
//! - [`FileStorage`]: a single JSON file, survives restarts
//!
//! Storage is synchronous. Callers above this layer treat every
//! [`StorageError`] as "storage unavailable" and fall back to defaults.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot be used at all (disabled, lock poisoned, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A string key/value store.
pub trait Storage: Send + Sync {
    /// Read a value. `Ok(None)` means the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn Storage>;

/// Storage keys owned by the storefront.
pub mod keys {
    /// Guest session identifier.
    pub const SESSION_ID: &str = "cart_session_id";

    /// Prefix of the per-session wishlist key (`wishlist_<sessionId>`).
    pub const WISHLIST_PREFIX: &str = "wishlist_";

    /// Customer access token.
    pub const CUSTOMER_ACCESS_TOKEN: &str = "customer_access_token";

    /// Customer refresh token.
    pub const CUSTOMER_REFRESH_TOKEN: &str = "customer_refresh_token";

    /// Cached customer profile.
    pub const CUSTOMER_USER: &str = "customer_user";

    /// Admin access token.
    pub const ADMIN_ACCESS_TOKEN: &str = "admin_access_token";

    /// Admin refresh token.
    pub const ADMIN_REFRESH_TOKEN: &str = "admin_refresh_token";

    /// Cached admin profile.
    pub const ADMIN_USER: &str = "admin_user";

    /// Wishlist key for a session.
    #[must_use]
    pub fn wishlist(session_id: &str) -> String {
        format!("{WISHLIST_PREFIX}{session_id}")
    }
}

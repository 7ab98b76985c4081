//! Guest session identity.
//!
//! A session id is created once per storage and reused forever. It only
//! partitions guest state (cart, wishlist); it is not a credential.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::{SharedStorage, keys};

/// Session id returned when storage cannot be read or written.
///
/// Used for that call only; the next call tries storage again.
pub const FALLBACK_SESSION_ID: &str = "guest-session";

/// Issues and persists the guest session id.
#[derive(Clone)]
pub struct SessionIdProvider {
    storage: SharedStorage,
}

impl SessionIdProvider {
    /// Create a provider over a storage backend.
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Return the stored session id, creating and persisting one if absent.
    ///
    /// Never fails: storage errors yield [`FALLBACK_SESSION_ID`]. Two
    /// processes creating an id at the same moment may both write; the last
    /// write wins.
    #[must_use]
    pub fn session_id(&self) -> String {
        match self.storage.get_item(keys::SESSION_ID) {
            Ok(Some(existing)) if !existing.trim().is_empty() => return existing,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Session storage unreadable, using fallback session id");
                return FALLBACK_SESSION_ID.to_string();
            }
        }

        let session_id = Uuid::new_v4().to_string();
        if let Err(e) = self.storage.set_item(keys::SESSION_ID, &session_id) {
            warn!(error = %e, "Failed to persist session id, using fallback session id");
            return FALLBACK_SESSION_ID.to_string();
        }

        debug!(session_id = %session_id, "Created guest session");
        session_id
    }
}

//! Guest wishlist kept in local storage.
//!
//! The wishlist lives entirely on the client, stored as a JSON array under
//! `wishlist_<sessionId>`. Every operation reads the stored state, applies
//! the change and writes it back. Operations never fail: unreadable or
//! corrupt state reads as empty, and a failed write returns the state as it
//! was before the change.

use chrono::{DateTime, Utc};
use copperpot_core::{ProductId, ProductSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::SessionIdProvider;
use crate::storage::{SharedStorage, keys};

/// One wishlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Entry id, unique per add.
    pub id: Uuid,
    /// The wishlisted product.
    pub product_id: ProductId,
    /// Product details at add time.
    pub product: ProductSnapshot,
    /// When the entry was added.
    pub added_at: DateTime<Utc>,
}

/// The stored wishlist: insertion-ordered, at most one entry per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl Wishlist {
    /// Entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the wishlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the product has an entry.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }
}

/// Local wishlist store scoped to the guest session.
#[derive(Clone)]
pub struct WishlistStore {
    storage: SharedStorage,
    session: SessionIdProvider,
}

impl WishlistStore {
    /// Create a store over a storage backend.
    #[must_use]
    pub fn new(storage: SharedStorage, session: SessionIdProvider) -> Self {
        Self { storage, session }
    }

    fn key(&self) -> String {
        keys::wishlist(&self.session.session_id())
    }

    /// Current wishlist; empty if absent, unreadable or corrupt.
    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        let key = self.key();
        match self.storage.get_item(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, key = %key, "Discarding corrupt wishlist");
                Wishlist::default()
            }),
            Ok(None) => Wishlist::default(),
            Err(e) => {
                warn!(error = %e, "Wishlist storage unreadable");
                Wishlist::default()
            }
        }
    }

    /// Persist `next`, or return `previous` if the write fails.
    fn persist(&self, previous: Wishlist, next: Wishlist) -> Wishlist {
        let key = self.key();
        let written = serde_json::to_string(&next)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set_item(&key, &json));

        match written {
            Ok(()) => next,
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to save wishlist, keeping previous state");
                previous
            }
        }
    }

    /// Add a product. No-op if the product is already wishlisted.
    pub fn add_item(&self, product: &ProductSnapshot) -> Wishlist {
        let current = self.wishlist();
        if current.contains(product.id) {
            debug!(product_id = %product.id, "Product already in wishlist");
            return current;
        }

        let mut next = current.clone();
        next.items.push(WishlistItem {
            id: Uuid::new_v4(),
            product_id: product.id,
            product: product.clone(),
            added_at: Utc::now(),
        });
        self.persist(current, next)
    }

    /// Remove a product's entry. Absent products leave the wishlist unchanged.
    pub fn remove_item(&self, product_id: ProductId) -> Wishlist {
        let current = self.wishlist();
        if !current.contains(product_id) {
            return current;
        }

        let mut next = current.clone();
        next.items.retain(|item| item.product_id != product_id);
        self.persist(current, next)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Wishlist {
        let current = self.wishlist();
        self.persist(current, Wishlist::default())
    }

    /// Whether the product is wishlisted.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.wishlist().contains(product_id)
    }

    /// Number of wishlisted products.
    #[must_use]
    pub fn count(&self) -> usize {
        self.wishlist().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use copperpot_core::Price;

    use super::*;
    use crate::storage::testing::{ReadOnlyStorage, UnavailableStorage};
    use crate::storage::{MemoryStorage, Storage};

    fn store_over(storage: SharedStorage) -> WishlistStore {
        WishlistStore::new(storage.clone(), SessionIdProvider::new(storage))
    }

    fn store() -> WishlistStore {
        store_over(Arc::new(MemoryStorage::new()))
    }

    fn pan() -> ProductSnapshot {
        ProductSnapshot::new(ProductId::new(1), "Pan", Price::from_units(1000))
    }

    fn kettle() -> ProductSnapshot {
        ProductSnapshot::new(ProductId::new(2), "Kettle", Price::from_units(2500))
    }

    #[test]
    fn test_add_same_product_twice_keeps_one_entry() {
        let store = store();

        let first = store.add_item(&pan());
        let second = store.add_item(&ProductSnapshot::new(
            ProductId::new(1),
            "Pan (renamed)",
            Price::from_units(900),
        ));

        assert_eq!(second.len(), 1);
        assert_eq!(second.items()[0].id, first.items()[0].id);
        assert_eq!(second.items()[0].product.name, "Pan");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_contains_follows_add_and_remove() {
        let store = store();

        store.add_item(&pan());
        assert!(store.contains(ProductId::new(1)));

        store.remove_item(ProductId::new(1));
        assert!(!store.contains(ProductId::new(1)));
    }

    #[test]
    fn test_remove_absent_product_is_noop() {
        let store = store();
        store.add_item(&pan());

        let before = store.wishlist();
        let after = store.remove_item(ProductId::new(99));

        assert_eq!(before, after);
        assert_eq!(store.wishlist(), before);
    }

    #[test]
    fn test_clear_empties_wishlist() {
        let store = store();
        store.add_item(&pan());
        store.add_item(&kettle());

        let cleared = store.clear();

        assert!(cleared.is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let store = store();
        store.add_item(&kettle());
        store.add_item(&pan());

        let ids: Vec<_> = store.wishlist().items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(1)]);
    }

    #[test]
    fn test_stored_under_session_key() {
        let storage: SharedStorage = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        store.add_item(&pan());

        let session_id = SessionIdProvider::new(storage.clone()).session_id();
        let raw = storage.get_item(&keys::wishlist(&session_id)).unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(stored.is_array());
        assert_eq!(stored[0]["product_id"], 1);
    }

    #[test]
    fn test_corrupt_state_reads_as_empty() {
        let storage: SharedStorage = Arc::new(MemoryStorage::new());
        let store = store_over(storage.clone());
        let key = keys::wishlist(&SessionIdProvider::new(storage.clone()).session_id());
        storage.set_item(&key, "{definitely not a wishlist").unwrap();

        assert!(store.wishlist().is_empty());

        // The next write replaces the corrupt blob.
        store.add_item(&pan());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_unavailable_storage_degrades_to_empty() {
        let store = store_over(Arc::new(UnavailableStorage));

        assert!(store.add_item(&pan()).is_empty());
        assert!(!store.contains(ProductId::new(1)));
        assert_eq!(store.count(), 0);
        assert!(store.clear().is_empty());
    }

    #[test]
    fn test_failed_write_returns_previous_state() {
        let inner = MemoryStorage::new();
        inner.set_item(keys::SESSION_ID, "s1").unwrap();
        let seeded = store_over(Arc::new(MemoryStorage::new()));
        seeded.add_item(&pan());
        let json = serde_json::to_string(&seeded.wishlist()).unwrap();
        inner.set_item(&keys::wishlist("s1"), &json).unwrap();

        let store = store_over(Arc::new(ReadOnlyStorage(inner)));
        let after = store.add_item(&kettle());

        assert_eq!(after.len(), 1);
        assert!(after.contains(ProductId::new(1)));
        assert!(!after.contains(ProductId::new(2)));
    }
}

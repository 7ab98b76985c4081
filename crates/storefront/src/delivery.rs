//! Delivery locations and their fees.
//!
//! Locations change rarely, so the list is cached in memory via `moka`
//! (default 5 minute TTL, see `COPPERPOT_DELIVERY_CACHE_SECS`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use copperpot_core::DeliveryLocationId;
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::{ApiError, DeliveryLocation};

/// Backend operations [`DeliveryLocations`] needs.
pub trait DeliveryBackend: Send + Sync {
    /// `GET /delivery-locations`.
    fn delivery_locations(
        &self,
    ) -> impl Future<Output = Result<Vec<DeliveryLocation>, ApiError>> + Send;
}

const CACHE_KEY: &str = "delivery-locations";

/// Cached delivery location lookup.
pub struct DeliveryLocations<B> {
    backend: B,
    cache: Cache<&'static str, Arc<Vec<DeliveryLocation>>>,
}

impl<B: DeliveryBackend> DeliveryLocations<B> {
    /// Create a lookup caching results for `ttl`.
    #[must_use]
    pub fn new(backend: B, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { backend, cache }
    }

    /// Every location the backend knows, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is not cached and the backend call fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Arc<Vec<DeliveryLocation>>, ApiError> {
        if let Some(locations) = self.cache.get(&CACHE_KEY).await {
            debug!("Cache hit for delivery locations");
            return Ok(locations);
        }

        let locations = Arc::new(self.backend.delivery_locations().await?);
        self.cache.insert(CACHE_KEY, Arc::clone(&locations)).await;
        Ok(locations)
    }

    /// Locations offered at checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be loaded.
    pub async fn active(&self) -> Result<Vec<DeliveryLocation>, ApiError> {
        Ok(self
            .all()
            .await?
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect())
    }

    /// Resolve an active location by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be loaded.
    pub async fn find(&self, id: DeliveryLocationId) -> Result<Option<DeliveryLocation>, ApiError> {
        Ok(self
            .all()
            .await?
            .iter()
            .find(|l| l.id == id && l.is_active)
            .cloned())
    }

    /// Drop the cached list.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::MockDeliveryBackend;
    use super::*;

    fn lookup() -> DeliveryLocations<MockDeliveryBackend> {
        DeliveryLocations::new(MockDeliveryBackend::default(), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_locations_are_cached() {
        let delivery = lookup();

        assert_eq!(delivery.all().await.unwrap().len(), 3);
        assert_eq!(delivery.active().await.unwrap().len(), 2);
        delivery.find(DeliveryLocationId::new(1)).await.unwrap();

        assert_eq!(delivery.backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_find_skips_inactive() {
        let delivery = lookup();

        let karen = delivery.find(DeliveryLocationId::new(2)).await.unwrap().unwrap();
        assert_eq!(karen.name, "Karen");

        assert!(delivery.find(DeliveryLocationId::new(3)).await.unwrap().is_none());
        assert!(delivery.find(DeliveryLocationId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let delivery = lookup();

        delivery.all().await.unwrap();
        delivery.invalidate().await;
        delivery.all().await.unwrap();

        assert_eq!(delivery.backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_reload() {
        let delivery =
            DeliveryLocations::new(MockDeliveryBackend::default(), Duration::from_millis(20));

        delivery.all().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        delivery.all().await.unwrap();

        assert_eq!(delivery.backend.calls(), 2);
    }
}

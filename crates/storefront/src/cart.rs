//! Server-backed cart.
//!
//! The backend owns the cart; [`CartStore`] keeps the last response as a
//! cached snapshot. Every mutation is one round trip scoped by the guest
//! session id, and its response replaces the snapshot wholesale.

use std::collections::BTreeMap;
use std::future::Future;

use copperpot_core::{CartItemId, ProductId};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::api::{ApiError, Cart};
use crate::session::SessionIdProvider;

/// Backend operations a [`CartStore`] needs.
///
/// Implemented by [`ApiClient`](crate::api::ApiClient); tests supply mocks.
pub trait CartBackend: Send + Sync {
    /// `GET /cart`.
    fn fetch_cart(&self, session_id: &str) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `POST /cart/items`.
    fn add_item(
        &self,
        session_id: &str,
        product_id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `PUT /cart/items/:id`.
    fn update_item(
        &self,
        session_id: &str,
        item_id: CartItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `DELETE /cart/items/:id`.
    fn remove_item(
        &self,
        session_id: &str,
        item_id: CartItemId,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `DELETE /cart`.
    fn clear_cart(&self, session_id: &str) -> impl Future<Output = Result<Cart, ApiError>> + Send;
}

/// Cart client for the current guest session.
pub struct CartStore<B> {
    backend: B,
    session: SessionIdProvider,
    cached: RwLock<Option<Cart>>,
}

impl<B: CartBackend> CartStore<B> {
    /// Create a store. Nothing is fetched until the first call.
    #[must_use]
    pub fn new(backend: B, session: SessionIdProvider) -> Self {
        Self {
            backend,
            session,
            cached: RwLock::new(None),
        }
    }

    /// Session id the cart is scoped by.
    #[must_use]
    pub fn session_id(&self) -> String {
        self.session.session_id()
    }

    /// Last cart seen, without a round trip. Empty before the first load.
    pub async fn cached(&self) -> Cart {
        self.cached.read().await.clone().unwrap_or_default()
    }

    /// The cart, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the first load fails.
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        if let Some(cart) = self.cached.read().await.clone() {
            return Ok(cart);
        }
        self.refresh().await
    }

    /// Reload the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart, ApiError> {
        let session_id = self.session_id();
        let cart = self.backend.fetch_cart(&session_id).await?;
        Ok(self.replace(cart).await)
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a zero quantity, otherwise whatever
    /// the backend returns.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<Cart, ApiError> {
        if quantity == 0 {
            return Err(zero_quantity());
        }
        let session_id = self.session_id();
        let cart = self
            .backend
            .add_item(&session_id, product_id, quantity)
            .await?;
        Ok(self.replace(cart).await)
    }

    /// Set a line's quantity. A quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(item_id = %item_id, quantity))]
    pub async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<Cart, ApiError> {
        if quantity == 0 {
            return self.remove_item(item_id).await;
        }
        let session_id = self.session_id();
        let cart = self
            .backend
            .update_item(&session_id, item_id, quantity)
            .await?;
        Ok(self.replace(cart).await)
    }

    /// Remove a line.
    ///
    /// A line missing from the cached cart triggers one refresh; if it is
    /// still missing the refreshed cart is returned unchanged. A 404 from
    /// the delete also counts as already removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh or the delete fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<Cart, ApiError> {
        if self.cached().await.item(item_id).is_none() {
            let fresh = self.refresh().await?;
            if fresh.item(item_id).is_none() {
                debug!("Cart line already absent");
                return Ok(fresh);
            }
        }
        self.delete_line(item_id).await
    }

    /// Remove the line holding a product, with the same retry rules as
    /// [`remove_item`](Self::remove_item).
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh or the delete fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Cart, ApiError> {
        let line = self.cached().await.item_for_product(product_id).map(|i| i.id);
        let line = match line {
            Some(id) => id,
            None => {
                let fresh = self.refresh().await?;
                match fresh.item_for_product(product_id) {
                    Some(item) => item.id,
                    None => {
                        debug!("Product not in cart");
                        return Ok(fresh);
                    }
                }
            }
        };
        self.delete_line(line).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, ApiError> {
        let session_id = self.session_id();
        let cart = self.backend.clear_cart(&session_id).await?;
        Ok(self.replace(cart).await)
    }

    async fn delete_line(&self, item_id: CartItemId) -> Result<Cart, ApiError> {
        let session_id = self.session_id();
        match self.backend.remove_item(&session_id, item_id).await {
            Ok(cart) => Ok(self.replace(cart).await),
            Err(e) if e.is_not_found() => {
                debug!("Cart line gone on the backend, refreshing");
                self.refresh().await
            }
            Err(e) => Err(e),
        }
    }

    async fn replace(&self, cart: Cart) -> Cart {
        *self.cached.write().await = Some(cart.clone());
        cart
    }
}

fn zero_quantity() -> ApiError {
    let message = "Quantity must be at least 1.".to_string();
    ApiError::Validation {
        fields: BTreeMap::from([("quantity".to_string(), vec![message.clone()])]),
        message,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use copperpot_core::{CartItemId, Price, ProductId, ProductSnapshot};

    use super::CartBackend;
    use crate::api::{ApiError, Cart, CartItem};

    /// In-memory cart backend that counts calls.
    #[derive(Default)]
    pub struct MockCartBackend {
        pub cart: Mutex<Cart>,
        pub fetches: AtomicUsize,
        pub deletes: AtomicUsize,
        pub clears: AtomicUsize,
        pub fail_with_server_error: bool,
    }

    impl MockCartBackend {
        /// Backend whose cart holds one line per `(line id, product id, qty)`.
        pub fn with_lines(lines: &[(i64, i64, u32)]) -> Self {
            let items = lines
                .iter()
                .map(|&(id, product, quantity)| line(id, product, quantity))
                .collect();
            Self {
                cart: Mutex::new(Cart {
                    items,
                    ..Cart::default()
                }),
                ..Self::default()
            }
        }

        pub fn count(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }

        fn snapshot(&self, session_id: &str) -> Result<Cart, ApiError> {
            if self.fail_with_server_error {
                return Err(ApiError::Server {
                    status: 503,
                    message: "maintenance".to_string(),
                });
            }
            let mut cart = self.cart.lock().map_err(|_| ApiError::MissingData)?.clone();
            cart.session_id = Some(session_id.to_string());
            Ok(cart)
        }
    }

    pub fn line(id: i64, product: i64, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            quantity,
            product: ProductSnapshot::new(
                ProductId::new(product),
                format!("Product {product}"),
                Price::from_units(500),
            ),
        }
    }

    impl CartBackend for MockCartBackend {
        async fn fetch_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.snapshot(session_id)
        }

        async fn add_item(
            &self,
            session_id: &str,
            product_id: ProductId,
            quantity: u32,
        ) -> Result<Cart, ApiError> {
            {
                let mut cart = self.cart.lock().map_err(|_| ApiError::MissingData)?;
                if let Some(item) = cart.items.iter_mut().find(|i| i.product_id == product_id) {
                    item.quantity += quantity;
                } else {
                    let next_id = cart.items.iter().map(|i| i.id.as_i64()).max().unwrap_or(0) + 1;
                    cart.items.push(line(next_id, product_id.as_i64(), quantity));
                }
            }
            self.snapshot(session_id)
        }

        async fn update_item(
            &self,
            session_id: &str,
            item_id: CartItemId,
            quantity: u32,
        ) -> Result<Cart, ApiError> {
            {
                let mut cart = self.cart.lock().map_err(|_| ApiError::MissingData)?;
                let item = cart
                    .items
                    .iter_mut()
                    .find(|i| i.id == item_id)
                    .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;
                item.quantity = quantity;
            }
            self.snapshot(session_id)
        }

        async fn remove_item(&self, session_id: &str, item_id: CartItemId) -> Result<Cart, ApiError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            {
                let mut cart = self.cart.lock().map_err(|_| ApiError::MissingData)?;
                let before = cart.items.len();
                cart.items.retain(|i| i.id != item_id);
                if cart.items.len() == before {
                    return Err(ApiError::NotFound("Cart item not found".to_string()));
                }
            }
            self.snapshot(session_id)
        }

        async fn clear_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.cart.lock().map_err(|_| ApiError::MissingData)?.items.clear();
            self.snapshot(session_id)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::testing::{MockCartBackend, line};
    use super::*;
    use crate::storage::MemoryStorage;

    fn store(backend: MockCartBackend) -> CartStore<MockCartBackend> {
        let session = SessionIdProvider::new(Arc::new(MemoryStorage::new()));
        CartStore::new(backend, session)
    }

    fn deletes(store: &CartStore<MockCartBackend>) -> usize {
        MockCartBackend::count(&store.backend.deletes)
    }

    fn fetches(store: &CartStore<MockCartBackend>) -> usize {
        MockCartBackend::count(&store.backend.fetches)
    }

    #[tokio::test]
    async fn test_cart_loads_once_then_uses_cache() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));

        let first = store.cart().await.unwrap();
        let second = store.cart().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.item_count(), 2);
        assert_eq!(fetches(&store), 1);
        assert_eq!(first.session_id, Some(store.session_id()));
    }

    #[tokio::test]
    async fn test_add_item_replaces_cache() {
        let store = store(MockCartBackend::default());

        let cart = store.add_item(ProductId::new(10), 3).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(store.cached().await, cart);
        assert_eq!(fetches(&store), 0);
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_rejected() {
        let store = store(MockCartBackend::default());

        let err = store.add_item(ProductId::new(10), 0).await.unwrap_err();

        let ApiError::Validation { fields, .. } = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("quantity"));
        assert!(store.backend.cart.lock().unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2), (2, 11, 1)]));
        store.refresh().await.unwrap();

        let cart = store.update_item(CartItemId::new(1), 0).await.unwrap();

        assert!(cart.item(CartItemId::new(1)).is_none());
        assert_eq!(cart.items.len(), 1);
        assert_eq!(deletes(&store), 1);
    }

    #[tokio::test]
    async fn test_update_quantity() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));
        let cart = store.update_item(CartItemId::new(1), 5).await.unwrap();
        assert_eq!(cart.item_count(), 5);
    }

    #[tokio::test]
    async fn test_remove_unknown_line_refreshes_once_without_delete() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));
        store.refresh().await.unwrap();

        let cart = store.remove_item(CartItemId::new(99)).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(fetches(&store), 2);
        assert_eq!(deletes(&store), 0);
    }

    #[tokio::test]
    async fn test_remove_line_added_elsewhere() {
        // The cache is stale: another tab added line 2.
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));
        store.refresh().await.unwrap();
        store.backend.cart.lock().unwrap().items.push(line(2, 11, 1));

        let cart = store.remove_item(CartItemId::new(2)).await.unwrap();

        assert!(cart.item(CartItemId::new(2)).is_none());
        assert_eq!(fetches(&store), 2);
        assert_eq!(deletes(&store), 1);
    }

    #[tokio::test]
    async fn test_delete_404_counts_as_removed() {
        // The cache still shows line 1 but the backend already dropped it.
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));
        store.refresh().await.unwrap();
        store.backend.cart.lock().unwrap().items.clear();

        let cart = store.remove_item(CartItemId::new(1)).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(deletes(&store), 1);
        assert!(store.cached().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_product() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2), (2, 11, 1)]));

        let cart = store.remove_product(ProductId::new(11)).await.unwrap();
        assert!(cart.item_for_product(ProductId::new(11)).is_none());

        let cart = store.remove_product(ProductId::new(11)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(deletes(&store), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store(MockCartBackend::with_lines(&[(1, 10, 2)]));
        let cart = store.clear().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(MockCartBackend::count(&store.backend.clears), 1);
    }

    #[tokio::test]
    async fn test_server_error_keeps_cache() {
        let backend = MockCartBackend {
            fail_with_server_error: true,
            ..MockCartBackend::default()
        };
        let store = store(backend);

        assert!(store.refresh().await.unwrap_err().is_server_side());
        assert!(store.cached().await.is_empty());
    }
}

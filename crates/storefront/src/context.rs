//! Providers: the stores wrapped with user feedback.
//!
//! The stores return plain results. The contexts here are what a UI talks
//! to: each mutation also produces a toast, cart mutations leave Sentry
//! breadcrumbs, and server-side failures are reported. [`Storefront`]
//! assembles every context over one storage backend and one API client.

use std::sync::Arc;

use copperpot_core::{CartItemId, DeliveryLocationId, ProductId, ProductSnapshot};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, Cart, DeliveryLocation};
use crate::auth::{AuthBackend, AuthManager, AuthPhase, AuthRealm};
use crate::cart::{CartBackend, CartStore};
use crate::checkout::{self, CheckoutDetails, CheckoutLink};
use crate::config::StorefrontConfig;
use crate::delivery::{DeliveryBackend, DeliveryLocations};
use crate::error::{self, Result, StorefrontError, add_breadcrumb};
use crate::notify::{SharedNotifier, Toast};
use crate::session::SessionIdProvider;
use crate::storage::{FileStorage, SharedStorage};
use crate::wishlist::{Wishlist, WishlistStore};

// =============================================================================
// Wishlist
// =============================================================================

/// Wishlist store with toasts.
pub struct WishlistContext {
    store: WishlistStore,
    notifier: SharedNotifier,
}

impl WishlistContext {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: WishlistStore, notifier: SharedNotifier) -> Self {
        Self { store, notifier }
    }

    /// Current wishlist.
    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        self.store.wishlist()
    }

    /// Whether a product is wishlisted.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.store.contains(product_id)
    }

    /// Number of wishlisted products.
    #[must_use]
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Add a product.
    pub fn add(&self, product: &ProductSnapshot) -> Wishlist {
        if self.store.contains(product.id) {
            self.notifier
                .notify(Toast::info(format!("{} is already in your wishlist.", product.name)));
            return self.store.wishlist();
        }

        let wishlist = self.store.add_item(product);
        if wishlist.contains(product.id) {
            self.notifier
                .notify(Toast::success(format!("Added {} to your wishlist.", product.name)));
        } else {
            self.notifier.notify(Toast::error(error::RETRY_MESSAGE));
        }
        wishlist
    }

    /// Remove a product.
    pub fn remove(&self, product_id: ProductId) -> Wishlist {
        let wishlist = self.store.remove_item(product_id);
        if wishlist.contains(product_id) {
            self.notifier.notify(Toast::error(error::RETRY_MESSAGE));
        } else {
            self.notifier.notify(Toast::success("Removed from your wishlist."));
        }
        wishlist
    }

    /// Add the product if absent, remove it if present. Returns whether it
    /// is wishlisted afterwards.
    pub fn toggle(&self, product: &ProductSnapshot) -> bool {
        if self.store.contains(product.id) {
            self.remove(product.id).contains(product.id)
        } else {
            self.add(product).contains(product.id)
        }
    }

    /// Remove everything.
    pub fn clear(&self) -> Wishlist {
        let wishlist = self.store.clear();
        self.notifier.notify(Toast::info("Your wishlist is empty."));
        wishlist
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart store with toasts, breadcrumbs and error reporting.
pub struct CartContext<B> {
    store: CartStore<B>,
    notifier: SharedNotifier,
}

impl<B: CartBackend> CartContext<B> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: CartStore<B>, notifier: SharedNotifier) -> Self {
        Self { store, notifier }
    }

    /// Last cart seen, without a round trip.
    pub async fn cached(&self) -> Cart {
        self.store.cached().await
    }

    /// Number of units in the last cart seen.
    pub async fn item_count(&self) -> u32 {
        self.store.cached().await.item_count()
    }

    /// The cart, loading it on first use. Failures are reported but not toasted.
    ///
    /// # Errors
    ///
    /// Returns an error if the load fails.
    pub async fn cart(&self) -> Result<Cart> {
        self.store.cart().await.map_err(reported)
    }

    /// Reload from the backend. Failures are reported but not toasted.
    ///
    /// # Errors
    ///
    /// Returns an error if the reload fails.
    pub async fn refresh(&self) -> Result<Cart> {
        self.store.refresh().await.map_err(reported)
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is zero or the backend call fails.
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<Cart> {
        let id = product_id.to_string();
        let qty = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Add item",
            Some(&[("product_id", id.as_str()), ("quantity", qty.as_str())]),
        );
        let result = self.store.add_item(product_id, quantity).await;
        self.finish(result, "Added to cart.")
    }

    /// Change a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<Cart> {
        let id = item_id.to_string();
        let qty = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Update item",
            Some(&[("item_id", id.as_str()), ("quantity", qty.as_str())]),
        );
        let result = self.store.update_item(item_id, quantity).await;
        let message = if quantity == 0 {
            "Removed from cart."
        } else {
            "Cart updated."
        };
        self.finish(result, message)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<Cart> {
        let id = item_id.to_string();
        add_breadcrumb("cart", "Remove item", Some(&[("item_id", id.as_str())]));
        let result = self.store.remove_item(item_id).await;
        self.finish(result, "Removed from cart.")
    }

    /// Remove the line holding a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Cart> {
        let id = product_id.to_string();
        add_breadcrumb("cart", "Remove product", Some(&[("product_id", id.as_str())]));
        let result = self.store.remove_product(product_id).await;
        self.finish(result, "Removed from cart.")
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn clear(&self) -> Result<Cart> {
        add_breadcrumb("cart", "Clear cart", None);
        let result = self.store.clear().await;
        self.finish(result, "Cart cleared.")
    }

    fn finish(&self, result: std::result::Result<Cart, ApiError>, success: &str) -> Result<Cart> {
        match result {
            Ok(cart) => {
                self.notifier.notify(Toast::success(success));
                Ok(cart)
            }
            Err(e) => {
                let err = StorefrontError::from(e);
                error::report(&err);
                self.notifier.notify(Toast::error(err.user_message()));
                Err(err)
            }
        }
    }
}

fn reported(e: ApiError) -> StorefrontError {
    let err = StorefrontError::from(e);
    error::report(&err);
    err
}

// =============================================================================
// Delivery
// =============================================================================

/// Delivery lookup with error toasts and reporting.
pub struct DeliveryContext<B> {
    locations: DeliveryLocations<B>,
    notifier: SharedNotifier,
}

impl<B: DeliveryBackend> DeliveryContext<B> {
    /// Wrap a lookup.
    #[must_use]
    pub fn new(locations: DeliveryLocations<B>, notifier: SharedNotifier) -> Self {
        Self {
            locations,
            notifier,
        }
    }

    /// Every location, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be loaded.
    pub async fn all(&self) -> Result<Arc<Vec<DeliveryLocation>>> {
        let result = self.locations.all().await;
        self.finish(result)
    }

    /// Locations offered at checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be loaded.
    pub async fn active(&self) -> Result<Vec<DeliveryLocation>> {
        let result = self.locations.active().await;
        self.finish(result)
    }

    /// Resolve an active location by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be loaded.
    pub async fn find(&self, id: DeliveryLocationId) -> Result<Option<DeliveryLocation>> {
        let result = self.locations.find(id).await;
        self.finish(result)
    }

    /// Drop the cached list.
    pub async fn invalidate(&self) {
        self.locations.invalidate().await;
    }

    fn finish<T>(&self, result: std::result::Result<T, ApiError>) -> Result<T> {
        result.map_err(|e| {
            let err = reported(e);
            self.notifier.notify(Toast::error(err.user_message()));
            err
        })
    }
}

// =============================================================================
// Storefront
// =============================================================================

/// Every storefront context over one storage backend and one API client.
pub struct Storefront<B = ApiClient> {
    config: StorefrontConfig,
    session: SessionIdProvider,
    wishlist: WishlistContext,
    cart: CartContext<B>,
    customer: Arc<AuthManager<B>>,
    admin: Arc<AuthManager<B>>,
    delivery: DeliveryContext<B>,
    notifier: SharedNotifier,
}

impl Storefront<ApiClient> {
    /// Open the storage file and build an API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or the
    /// HTTP client cannot be built.
    pub fn from_config(config: StorefrontConfig, notifier: SharedNotifier) -> Result<Self> {
        let storage: SharedStorage = Arc::new(FileStorage::new(config.storage_path.clone())?);
        let backend = ApiClient::new(&config)?;
        Ok(Self::with_backend(config, backend, storage, notifier))
    }
}

impl<B> Storefront<B>
where
    B: CartBackend + AuthBackend + DeliveryBackend + Clone,
{
    /// Assemble the contexts over an explicit backend and storage.
    #[must_use]
    pub fn with_backend(
        config: StorefrontConfig,
        backend: B,
        storage: SharedStorage,
        notifier: SharedNotifier,
    ) -> Self {
        let session = SessionIdProvider::new(Arc::clone(&storage));
        let wishlist = WishlistContext::new(
            WishlistStore::new(Arc::clone(&storage), session.clone()),
            Arc::clone(&notifier),
        );
        let cart = CartContext::new(
            CartStore::new(backend.clone(), session.clone()),
            Arc::clone(&notifier),
        );
        let auth = |realm| {
            Arc::new(AuthManager::new(
                realm,
                backend.clone(),
                Arc::clone(&storage),
                Arc::clone(&notifier),
            ))
        };
        let customer = auth(AuthRealm::Customer);
        let admin = auth(AuthRealm::Admin);
        let delivery = DeliveryContext::new(
            DeliveryLocations::new(backend, config.delivery_cache_ttl),
            Arc::clone(&notifier),
        );

        Self {
            config,
            session,
            wishlist,
            cart,
            customer,
            admin,
            delivery,
            notifier,
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Guest session id.
    #[must_use]
    pub fn session_id(&self) -> String {
        self.session.session_id()
    }

    /// Wishlist context.
    #[must_use]
    pub const fn wishlist(&self) -> &WishlistContext {
        &self.wishlist
    }

    /// Cart context.
    #[must_use]
    pub const fn cart(&self) -> &CartContext<B> {
        &self.cart
    }

    /// Customer auth context.
    #[must_use]
    pub const fn customer(&self) -> &Arc<AuthManager<B>> {
        &self.customer
    }

    /// Admin auth context.
    #[must_use]
    pub const fn admin(&self) -> &Arc<AuthManager<B>> {
        &self.admin
    }

    /// Auth context for a realm.
    #[must_use]
    pub const fn auth(&self, realm: AuthRealm) -> &Arc<AuthManager<B>> {
        match realm {
            AuthRealm::Customer => &self.customer,
            AuthRealm::Admin => &self.admin,
        }
    }

    /// Delivery locations.
    #[must_use]
    pub const fn delivery(&self) -> &DeliveryContext<B> {
        &self.delivery
    }

    /// Restore persisted sessions for both realms.
    pub async fn restore_sessions(&self) -> (AuthPhase, AuthPhase) {
        tokio::join!(self.customer.restore(), self.admin.restore())
    }

    /// Start the expiry watch for both realms at the configured interval.
    #[must_use]
    pub fn spawn_session_watch(&self) -> Vec<JoinHandle<()>>
    where
        B: 'static,
    {
        let period = self.config.session_check_interval;
        vec![
            Arc::clone(&self.customer).spawn_expiry_watch(period),
            Arc::clone(&self.admin).spawn_expiry_watch(period),
        ]
    }

    /// Validate the details, build the WhatsApp order link and clear the cart.
    ///
    /// Clearing the cart is best-effort: the order has already been handed
    /// to WhatsApp when it runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the details are invalid, the cart is empty,
    /// checkout is not configured or the backend cannot be reached.
    #[instrument(skip(self, details))]
    pub async fn checkout(&self, details: &CheckoutDetails) -> Result<CheckoutLink> {
        let result = self.prepare_checkout(details).await;

        match result {
            Ok(link) => {
                add_breadcrumb("checkout", "WhatsApp order prepared", None);
                info!(total = %link.totals.total, "Checkout prepared");
                if let Err(e) = self.cart.store.clear().await {
                    warn!(error = %e, "Failed to clear cart after checkout");
                }
                self.notifier
                    .notify(Toast::success("Your order is ready to send on WhatsApp."));
                Ok(link)
            }
            Err(err) => {
                error::report(&err);
                self.notifier.notify(Toast::error(err.user_message()));
                Err(err)
            }
        }
    }

    async fn prepare_checkout(&self, details: &CheckoutDetails) -> Result<CheckoutLink> {
        // Form problems are reported without touching the backend.
        if self.config.whatsapp_number.is_none() {
            return Err(checkout::CheckoutError::WhatsAppNotConfigured.into());
        }
        details.validate()?;

        let cart = self.cart.store.refresh().await?;
        let location = match details.delivery_location_id {
            Some(id) => self.delivery.locations.find(id).await?,
            None => None,
        };

        Ok(checkout::prepare(
            self.config.whatsapp_number.as_ref(),
            &cart,
            details,
            location.as_ref(),
            &self.config.currency,
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use copperpot_core::{DeliveryLocationId, PhoneNumber, Price};
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::api::{Credentials, DeliveryLocation, RegisterRequest, TokenGrant, UserProfile};
    use crate::cart::testing::MockCartBackend;
    use crate::delivery::testing::MockDeliveryBackend;
    use crate::notify::ToastLevel;
    use crate::notify::testing::RecordingNotifier;
    use crate::storage::MemoryStorage;
    use crate::storage::testing::ReadOnlyStorage;

    #[derive(Clone, Default)]
    struct TestBackend {
        cart: Arc<MockCartBackend>,
        delivery: Arc<MockDeliveryBackend>,
    }

    impl CartBackend for TestBackend {
        async fn fetch_cart(&self, session_id: &str) -> std::result::Result<Cart, ApiError> {
            self.cart.fetch_cart(session_id).await
        }

        async fn add_item(
            &self,
            session_id: &str,
            product_id: ProductId,
            quantity: u32,
        ) -> std::result::Result<Cart, ApiError> {
            self.cart.add_item(session_id, product_id, quantity).await
        }

        async fn update_item(
            &self,
            session_id: &str,
            item_id: CartItemId,
            quantity: u32,
        ) -> std::result::Result<Cart, ApiError> {
            self.cart.update_item(session_id, item_id, quantity).await
        }

        async fn remove_item(
            &self,
            session_id: &str,
            item_id: CartItemId,
        ) -> std::result::Result<Cart, ApiError> {
            self.cart.remove_item(session_id, item_id).await
        }

        async fn clear_cart(&self, session_id: &str) -> std::result::Result<Cart, ApiError> {
            self.cart.clear_cart(session_id).await
        }
    }

    impl DeliveryBackend for TestBackend {
        async fn delivery_locations(&self) -> std::result::Result<Vec<DeliveryLocation>, ApiError> {
            self.delivery.delivery_locations().await
        }
    }

    fn unauthorized() -> ApiError {
        ApiError::Unauthorized("not in this test".to_string())
    }

    impl AuthBackend for TestBackend {
        async fn login(
            &self,
            _realm: AuthRealm,
            _credentials: &Credentials,
        ) -> std::result::Result<TokenGrant, ApiError> {
            Err(unauthorized())
        }

        async fn register(
            &self,
            _realm: AuthRealm,
            _request: &RegisterRequest,
        ) -> std::result::Result<TokenGrant, ApiError> {
            Err(unauthorized())
        }

        async fn refresh(
            &self,
            _realm: AuthRealm,
            _refresh_token: &SecretString,
        ) -> std::result::Result<TokenGrant, ApiError> {
            Err(unauthorized())
        }

        async fn logout(
            &self,
            _realm: AuthRealm,
            _access_token: &SecretString,
        ) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        async fn profile(
            &self,
            _realm: AuthRealm,
            _access_token: &SecretString,
        ) -> std::result::Result<UserProfile, ApiError> {
            Err(unauthorized())
        }

        async fn delete_account(
            &self,
            _realm: AuthRealm,
            _access_token: &SecretString,
            _password: &SecretString,
        ) -> std::result::Result<(), ApiError> {
            Err(unauthorized())
        }
    }

    fn config() -> StorefrontConfig {
        let mut config = StorefrontConfig::new(Url::parse("http://backend.test/api/").unwrap());
        config.whatsapp_number = Some(PhoneNumber::parse("+254 700 111 222").unwrap());
        config.currency = "KES".to_string();
        config
    }

    fn storefront(backend: TestBackend) -> (Storefront<TestBackend>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let storefront = Storefront::with_backend(
            config(),
            backend,
            Arc::new(MemoryStorage::new()),
            notifier.clone(),
        );
        (storefront, notifier)
    }

    fn pan() -> ProductSnapshot {
        ProductSnapshot::new(ProductId::new(1), "Pan", Price::from_units(1000))
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            full_name: "Amina Odhiambo".to_string(),
            phone: "0712 345 678".to_string(),
            address: "14 Riverside Drive".to_string(),
            delivery_location_id: Some(DeliveryLocationId::new(1)),
            notes: None,
        }
    }

    #[test]
    fn test_wishlist_toggle_and_toasts() {
        let (storefront, notifier) = storefront(TestBackend::default());
        let wishlist = storefront.wishlist();

        assert!(wishlist.toggle(&pan()));
        wishlist.add(&pan());
        assert_eq!(wishlist.count(), 1);
        assert!(!wishlist.toggle(&pan()));
        assert_eq!(wishlist.count(), 0);

        let levels: Vec<_> = notifier.toasts().into_iter().map(|t| t.level).collect();
        assert_eq!(
            levels,
            vec![ToastLevel::Success, ToastLevel::Info, ToastLevel::Success]
        );
    }

    #[test]
    fn test_wishlist_failed_write_toasts_error() {
        let notifier = Arc::new(RecordingNotifier::default());
        let storage = Arc::new(ReadOnlyStorage(MemoryStorage::new()));
        let session = SessionIdProvider::new(storage.clone());
        let context = WishlistContext::new(WishlistStore::new(storage, session), notifier.clone());

        let wishlist = context.add(&pan());

        assert!(wishlist.is_empty());
        assert_eq!(notifier.toasts()[0].level, ToastLevel::Error);
    }

    #[tokio::test]
    async fn test_cart_errors_become_toasts() {
        let (storefront, notifier) = storefront(TestBackend::default());

        let err = storefront
            .cart()
            .add_item(ProductId::new(1), 0)
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Quantity must be at least 1.");
        let toast = &notifier.toasts()[0];
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "Quantity must be at least 1.");
    }

    #[tokio::test]
    async fn test_cart_server_error_hides_details() {
        let backend = TestBackend {
            cart: Arc::new(MockCartBackend {
                fail_with_server_error: true,
                ..MockCartBackend::default()
            }),
            ..TestBackend::default()
        };
        let (storefront, notifier) = storefront(backend);

        storefront.cart().clear().await.unwrap_err();

        assert_eq!(notifier.toasts()[0].message, error::RETRY_MESSAGE);
    }

    #[tokio::test]
    async fn test_checkout_builds_link_and_clears_cart() {
        let backend = TestBackend::default();
        let (storefront, notifier) = storefront(backend.clone());
        storefront.cart().add_item(ProductId::new(5), 2).await.unwrap();

        let link = storefront.checkout(&details()).await.unwrap();

        assert!(link.url.as_str().starts_with("https://wa.me/254700111222?text="));
        assert!(link.message.contains("Delivery location: Westlands"));
        assert_eq!(link.totals.total, Price::from_units(1200));
        assert!(storefront.cart().cached().await.is_empty());
        assert_eq!(MockCartBackend::count(&backend.cart.clears), 1);
        assert_eq!(
            notifier.toasts().last().unwrap().message,
            "Your order is ready to send on WhatsApp."
        );
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let (storefront, _notifier) = storefront(TestBackend::default());

        let err = storefront.checkout(&details()).await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Checkout(checkout::CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_checkout_inactive_location() {
        let backend = TestBackend::default();
        let (storefront, _notifier) = storefront(backend);
        storefront.cart().add_item(ProductId::new(5), 1).await.unwrap();

        let details = CheckoutDetails {
            delivery_location_id: Some(DeliveryLocationId::new(3)),
            ..details()
        };
        let err = storefront.checkout(&details).await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Checkout(checkout::CheckoutError::UnknownDeliveryLocation)
        ));
        assert!(!storefront.cart().cached().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_sessions_without_tokens() {
        let (storefront, _notifier) = storefront(TestBackend::default());
        assert_eq!(
            storefront.restore_sessions().await,
            (AuthPhase::Unauthenticated, AuthPhase::Unauthenticated)
        );
        assert_eq!(storefront.auth(AuthRealm::Admin).realm(), AuthRealm::Admin);
    }

    #[tokio::test]
    async fn test_checkout_validates_before_calling_backend() {
        let backend = TestBackend {
            cart: Arc::new(MockCartBackend {
                fail_with_server_error: true,
                ..MockCartBackend::default()
            }),
            ..TestBackend::default()
        };
        let (storefront, notifier) = storefront(backend.clone());

        let err = storefront
            .checkout(&CheckoutDetails::default())
            .await
            .unwrap_err();

        let StorefrontError::Checkout(checkout) = &err else {
            panic!("expected a checkout error, got {err:?}");
        };
        assert_eq!(checkout.fields().len(), 4);
        assert_eq!(MockCartBackend::count(&backend.cart.fetches), 0);
        assert_eq!(backend.delivery.calls(), 0);
        assert_eq!(notifier.toasts()[0].message, err.user_message());
    }

    #[tokio::test]
    async fn test_checkout_without_whatsapp_number_skips_backend() {
        let backend = TestBackend::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut config = config();
        config.whatsapp_number = None;
        let storefront = Storefront::with_backend(
            config,
            backend.clone(),
            Arc::new(MemoryStorage::new()),
            notifier,
        );

        let err = storefront.checkout(&details()).await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Checkout(checkout::CheckoutError::WhatsAppNotConfigured)
        ));
        assert_eq!(MockCartBackend::count(&backend.cart.fetches), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_toasts_generic_message() {
        let backend = TestBackend {
            delivery: Arc::new(MockDeliveryBackend {
                fail_with_server_error: true,
                ..MockDeliveryBackend::default()
            }),
            ..TestBackend::default()
        };
        let (storefront, notifier) = storefront(backend);

        let err = storefront.delivery().active().await.unwrap_err();

        assert!(err.is_server_side());
        let toasts = notifier.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].level, ToastLevel::Error);
        assert_eq!(toasts[0].message, error::RETRY_MESSAGE);
    }

    #[test]
    fn test_delivery_failure_is_reported() {
        let events = sentry::test::with_captured_events(|| {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let backend = TestBackend {
                    delivery: Arc::new(MockDeliveryBackend {
                        fail_with_server_error: true,
                        ..MockDeliveryBackend::default()
                    }),
                    ..TestBackend::default()
                };
                let (storefront, _notifier) = storefront(backend);
                storefront
                    .delivery()
                    .find(DeliveryLocationId::new(1))
                    .await
                    .unwrap_err();
            });
        });

        assert_eq!(events.len(), 1);
    }
}

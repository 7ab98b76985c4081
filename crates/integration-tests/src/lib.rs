//! Integration tests for the Copperpot storefront SDK.
//!
//! [`FakeBackend`] serves the storefront REST API from memory on an
//! ephemeral local port, so the tests drive the real `ApiClient` over HTTP
//! without any external services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p copperpot-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Guest cart through the cart context
//! - `auth_flow` - Customer and admin sign-in, refresh and sign-out
//! - `delivery_checkout` - Delivery location cache and WhatsApp checkout

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use copperpot_core::{
    CartItemId, DeliveryLocationId, Email, PhoneNumber, Price, ProductId, ProductSnapshot, UserId,
};
use copperpot_storefront::api::{Cart, CartItem, DeliveryLocation, UserProfile};
use copperpot_storefront::notify::{ChannelNotifier, Toast, UiEvent};
use copperpot_storefront::storage::{MemoryStorage, SharedStorage};
use copperpot_storefront::{ApiClient, Storefront, StorefrontConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

/// Shop WhatsApp number configured on every test storefront.
pub const WHATSAPP_NUMBER: &str = "+254 700 123 456";

/// Seeded customer account.
pub const CUSTOMER_EMAIL: &str = "amina@example.com";
/// Password of [`CUSTOMER_EMAIL`].
pub const CUSTOMER_PASSWORD: &str = "correct-horse";

/// Seeded admin account.
pub const ADMIN_EMAIL: &str = "admin@copperpot.shop";
/// Password of [`ADMIN_EMAIL`].
pub const ADMIN_PASSWORD: &str = "admin-secret-1";

const DAY_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Realm {
    Customer,
    Admin,
}

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    realm: Realm,
    name: String,
    email: String,
    phone: Option<String>,
    password: String,
    role: Option<String>,
}

impl Account {
    fn profile(&self) -> UserProfile {
        UserProfile {
            id: UserId::new(self.id),
            name: self.name.clone(),
            email: Email::parse(&self.email).expect("fake backend accounts have valid emails"),
            phone: self.phone.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Grant {
    realm: Realm,
    account_id: i64,
    expires_at: i64,
}

struct Inner {
    catalog: Vec<ProductSnapshot>,
    locations: Vec<DeliveryLocation>,
    carts: HashMap<String, Vec<CartItem>>,
    next_item_id: i64,
    accounts: Vec<Account>,
    next_account_id: i64,
    access_tokens: HashMap<String, Grant>,
    refresh_tokens: HashMap<String, Grant>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    fail_refresh: bool,
}

impl Inner {
    fn seeded() -> Self {
        let product = |id, name: &str, price| {
            ProductSnapshot::new(ProductId::new(id), name, Price::from_units(price))
        };
        let location = |id, name: &str, fee, is_active| DeliveryLocation {
            id: DeliveryLocationId::new(id),
            name: name.to_string(),
            fee: Price::from_units(fee),
            is_active,
        };

        Self {
            catalog: vec![
                product(1, "Copper Saucepan", 4500),
                product(2, "Cast Iron Skillet", 3200),
                product(3, "Linen Apron", 1200),
            ],
            locations: vec![
                location(1, "Westlands", 200, true),
                location(2, "Karen", 450, true),
                location(3, "Thika", 800, false),
            ],
            carts: HashMap::new(),
            next_item_id: 100,
            accounts: vec![
                Account {
                    id: 1,
                    realm: Realm::Customer,
                    name: "Amina Odhiambo".to_string(),
                    email: CUSTOMER_EMAIL.to_string(),
                    phone: Some("+254712345678".to_string()),
                    password: CUSTOMER_PASSWORD.to_string(),
                    role: None,
                },
                Account {
                    id: 2,
                    realm: Realm::Admin,
                    name: "Shop Admin".to_string(),
                    email: ADMIN_EMAIL.to_string(),
                    phone: None,
                    password: ADMIN_PASSWORD.to_string(),
                    role: Some("manager".to_string()),
                },
            ],
            next_account_id: 3,
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 30 * DAY_SECS,
            fail_refresh: false,
        }
    }

    fn cart(&self, session_id: &str) -> Cart {
        Cart {
            session_id: Some(session_id.to_string()),
            items: self.carts.get(session_id).cloned().unwrap_or_default(),
            ..Cart::default()
        }
    }

    fn issue(&mut self, realm: Realm, account_id: i64) -> (String, String) {
        let now = Utc::now().timestamp();
        let access_expiry = now + self.access_ttl_secs;
        let refresh_expiry = now + self.refresh_ttl_secs;
        let access = jwt(account_id, access_expiry);
        let refresh = jwt(account_id, refresh_expiry);

        self.access_tokens.insert(
            access.clone(),
            Grant {
                realm,
                account_id,
                expires_at: access_expiry,
            },
        );
        self.refresh_tokens.insert(
            refresh.clone(),
            Grant {
                realm,
                account_id,
                expires_at: refresh_expiry,
            },
        );
        (access, refresh)
    }

    fn bearer(&self, headers: &HeaderMap, realm: Realm) -> Option<Account> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let grant = self.access_tokens.get(token)?;
        if grant.realm != realm || grant.expires_at <= Utc::now().timestamp() {
            return None;
        }
        self.accounts
            .iter()
            .find(|a| a.id == grant.account_id)
            .cloned()
    }
}

/// Build a JWT-shaped token. The signature is not checked by anyone.
fn jwt(account_id: i64, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "sub": account_id.to_string(),
        "exp": exp,
        "jti": Uuid::new_v4().to_string(),
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.fake-signature")
}

#[derive(Default)]
struct Counters {
    cart_fetches: AtomicUsize,
    delivery_fetches: AtomicUsize,
    refreshes: AtomicUsize,
    logouts: AtomicUsize,
}

struct BackendState {
    inner: Mutex<Inner>,
    counters: Counters,
}

type Shared = Arc<BackendState>;

/// In-memory storefront backend served over HTTP.
pub struct FakeBackend {
    url: Url,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend with the seeded catalog, locations and accounts.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState {
            inner: Mutex::new(Inner::seeded()),
            counters: Counters::default(),
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake backend address");
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}/api/")).expect("Valid fake backend URL");
        Self { url, state, server }
    }

    /// Base URL of the API, ending in `/api/`.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// A storefront over fresh in-memory storage, plus its event channel.
    #[must_use]
    pub fn storefront(&self) -> (Storefront, ChannelNotifier) {
        self.storefront_with_storage(Arc::new(MemoryStorage::new()))
    }

    /// A storefront over `storage`, plus its event channel.
    ///
    /// # Panics
    ///
    /// Panics if [`WHATSAPP_NUMBER`] does not parse.
    #[must_use]
    pub fn storefront_with_storage(&self, storage: SharedStorage) -> (Storefront, ChannelNotifier) {
        let mut config = StorefrontConfig::new(self.url.clone());
        config.whatsapp_number =
            Some(PhoneNumber::parse(WHATSAPP_NUMBER).expect("Valid WhatsApp number"));

        let notifier = ChannelNotifier::default();
        let storefront = Storefront::with_backend(
            config,
            ApiClient::with_base_url(self.url.clone()),
            storage,
            Arc::new(notifier.clone()),
        );
        (storefront, notifier)
    }

    /// Lines the backend holds for a session.
    pub async fn cart_lines(&self, session_id: &str) -> Vec<CartItem> {
        self.state.inner.lock().await.cart(session_id).items
    }

    /// Lifetime of access tokens issued from now on. Negative values issue
    /// tokens that are already expired.
    pub async fn set_access_ttl(&self, secs: i64) {
        self.state.inner.lock().await.access_ttl_secs = secs;
    }

    /// Lifetime of refresh tokens issued from now on.
    pub async fn set_refresh_ttl(&self, secs: i64) {
        self.state.inner.lock().await.refresh_ttl_secs = secs;
    }

    /// Make every refresh request fail with a 500.
    pub async fn set_fail_refresh(&self, fail: bool) {
        self.state.inner.lock().await.fail_refresh = fail;
    }

    /// Revoke every access token server-side; refresh tokens stay valid.
    pub async fn revoke_access_tokens(&self) {
        self.state.inner.lock().await.access_tokens.clear();
    }

    /// Number of live access tokens.
    pub async fn active_access_tokens(&self) -> usize {
        self.state.inner.lock().await.access_tokens.len()
    }

    /// Whether an account with this email exists.
    pub async fn account_exists(&self, email: &str) -> bool {
        self.state
            .inner
            .lock()
            .await
            .accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Number of `GET /cart` requests served.
    #[must_use]
    pub fn cart_fetches(&self) -> usize {
        self.state.counters.cart_fetches.load(Ordering::SeqCst)
    }

    /// Number of `GET /delivery-locations` requests served.
    #[must_use]
    pub fn delivery_fetches(&self) -> usize {
        self.state.counters.delivery_fetches.load(Ordering::SeqCst)
    }

    /// Number of refresh requests served, successful or not.
    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.state.counters.refreshes.load(Ordering::SeqCst)
    }

    /// Number of logout requests served.
    #[must_use]
    pub fn logouts(&self) -> usize {
        self.state.counters.logouts.load(Ordering::SeqCst)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Events received so far, without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Toasts received so far, without waiting.
pub fn drain_toasts(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<Toast> {
    drain_events(rx)
        .into_iter()
        .filter_map(|event| match event {
            UiEvent::Toast(toast) => Some(toast),
            UiEvent::Redirect(_) => None,
        })
        .collect()
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{id}", put(update_item).delete(remove_item))
        .route("/delivery-locations", get(delivery_locations))
        .route(
            "/customer/auth/login",
            post(|s: State<Shared>, b: Json<LoginBody>| login(s, Realm::Customer, b)),
        )
        .route(
            "/auth/login",
            post(|s: State<Shared>, b: Json<LoginBody>| login(s, Realm::Admin, b)),
        )
        .route("/customer/auth/register", post(register))
        .route(
            "/customer/auth/refresh",
            post(|s: State<Shared>, b: Json<RefreshBody>| refresh(s, Realm::Customer, b)),
        )
        .route(
            "/auth/refresh",
            post(|s: State<Shared>, b: Json<RefreshBody>| refresh(s, Realm::Admin, b)),
        )
        .route(
            "/customer/auth/logout",
            post(|s: State<Shared>, h: HeaderMap| logout(s, Realm::Customer, h)),
        )
        .route(
            "/auth/logout",
            post(|s: State<Shared>, h: HeaderMap| logout(s, Realm::Admin, h)),
        )
        .route(
            "/customer/auth/profile",
            get(|s: State<Shared>, h: HeaderMap| profile(s, Realm::Customer, h)),
        )
        .route(
            "/auth/profile",
            get(|s: State<Shared>, h: HeaderMap| profile(s, Realm::Admin, h)),
        )
        .route("/customer/auth/delete-account", post(delete_account));

    Router::new().nest("/api", api).with_state(state)
}

fn data(value: impl Serialize) -> Response {
    Json(json!({ "success": true, "data": value })).into_response()
}

fn done(message: &str) -> Response {
    Json(json!({ "success": true, "message": message })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn invalid(field: &str, message: &str) -> Response {
    let errors = BTreeMap::from([(field, vec![message])]);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": message, "errors": errors })),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Cart
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SessionQuery {
    session_id: String,
}

#[derive(Deserialize)]
struct AddItemBody {
    session_id: String,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Deserialize)]
struct UpdateItemBody {
    session_id: String,
    quantity: u32,
}

async fn get_cart(State(state): State<Shared>, Query(query): Query<SessionQuery>) -> Response {
    state.counters.cart_fetches.fetch_add(1, Ordering::SeqCst);
    let inner = state.inner.lock().await;
    data(inner.cart(&query.session_id))
}

async fn add_item(State(state): State<Shared>, Json(body): Json<AddItemBody>) -> Response {
    if body.quantity == 0 {
        return invalid("quantity", "The quantity must be at least 1.");
    }

    let mut inner = state.inner.lock().await;
    let Some(product) = inner.catalog.iter().find(|p| p.id == body.product_id).cloned() else {
        return failure(StatusCode::NOT_FOUND, "Product not found.");
    };

    let next_id = inner.next_item_id;
    let lines = inner.carts.entry(body.session_id.clone()).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product_id == body.product_id) {
        line.quantity += body.quantity;
    } else {
        lines.push(CartItem {
            id: CartItemId::new(next_id),
            product_id: body.product_id,
            quantity: body.quantity,
            product,
        });
        inner.next_item_id += 1;
    }

    data(inner.cart(&body.session_id))
}

async fn update_item(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateItemBody>,
) -> Response {
    let mut inner = state.inner.lock().await;
    let item_id = CartItemId::new(id);
    let Some(lines) = inner.carts.get_mut(&body.session_id) else {
        return failure(StatusCode::NOT_FOUND, "Cart item not found.");
    };
    let Some(index) = lines.iter().position(|l| l.id == item_id) else {
        return failure(StatusCode::NOT_FOUND, "Cart item not found.");
    };

    if body.quantity == 0 {
        lines.remove(index);
    } else if let Some(line) = lines.get_mut(index) {
        line.quantity = body.quantity;
    }

    data(inner.cart(&body.session_id))
}

/// Answers without the cart, like the real backend's delete.
async fn remove_item(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let mut inner = state.inner.lock().await;
    let item_id = CartItemId::new(id);
    let removed = inner.carts.get_mut(&query.session_id).is_some_and(|lines| {
        let before = lines.len();
        lines.retain(|l| l.id != item_id);
        lines.len() < before
    });

    if removed {
        done("Item removed from cart.")
    } else {
        failure(StatusCode::NOT_FOUND, "Cart item not found.")
    }
}

async fn clear_cart(State(state): State<Shared>, Query(query): Query<SessionQuery>) -> Response {
    state.inner.lock().await.carts.remove(&query.session_id);
    done("Cart cleared.")
}

async fn delivery_locations(State(state): State<Shared>) -> Response {
    state.counters.delivery_fetches.fetch_add(1, Ordering::SeqCst);
    data(&state.inner.lock().await.locations)
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    #[serde(default)]
    phone: Option<String>,
    password: String,
    password_confirmation: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

#[derive(Deserialize)]
struct DeleteAccountBody {
    password: String,
}

fn token_grant(access: String, refresh: String, user: Option<UserProfile>) -> Response {
    data(json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "Bearer",
        "user": user,
    }))
}

async fn login(State(state): State<Shared>, realm: Realm, Json(body): Json<LoginBody>) -> Response {
    let mut inner = state.inner.lock().await;
    let Some(account) = inner
        .accounts
        .iter()
        .find(|a| {
            a.realm == realm && a.email.eq_ignore_ascii_case(&body.email) && a.password == body.password
        })
        .cloned()
    else {
        return failure(StatusCode::UNAUTHORIZED, "Invalid credentials.");
    };

    let (access, refresh) = inner.issue(realm, account.id);
    token_grant(access, refresh, Some(account.profile()))
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    if body.password != body.password_confirmation {
        return invalid("password", "The password confirmation does not match.");
    }

    let mut inner = state.inner.lock().await;
    if inner
        .accounts
        .iter()
        .any(|a| a.email.eq_ignore_ascii_case(&body.email))
    {
        return invalid("email", "The email has already been taken.");
    }

    let account = Account {
        id: inner.next_account_id,
        realm: Realm::Customer,
        name: body.name,
        email: body.email,
        phone: body.phone,
        password: body.password,
        role: None,
    };
    inner.next_account_id += 1;
    inner.accounts.push(account.clone());

    let (access, refresh) = inner.issue(Realm::Customer, account.id);
    token_grant(access, refresh, Some(account.profile()))
}

/// Rotates the refresh token and leaves the profile out of the grant.
async fn refresh(
    State(state): State<Shared>,
    realm: Realm,
    Json(body): Json<RefreshBody>,
) -> Response {
    state.counters.refreshes.fetch_add(1, Ordering::SeqCst);
    let mut inner = state.inner.lock().await;
    if inner.fail_refresh {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Refresh is unavailable.");
    }

    let now = Utc::now().timestamp();
    let grant = match inner.refresh_tokens.remove(&body.refresh_token) {
        Some(grant) if grant.realm == realm && grant.expires_at > now => grant,
        _ => return failure(StatusCode::UNAUTHORIZED, "Invalid refresh token."),
    };

    let (access, refresh) = inner.issue(realm, grant.account_id);
    token_grant(access, refresh, None)
}

async fn logout(State(state): State<Shared>, realm: Realm, headers: HeaderMap) -> Response {
    state.counters.logouts.fetch_add(1, Ordering::SeqCst);
    let mut inner = state.inner.lock().await;
    let Some(account) = inner.bearer(&headers, realm) else {
        return failure(StatusCode::UNAUTHORIZED, "Unauthenticated.");
    };

    inner.access_tokens.retain(|_, g| g.account_id != account.id);
    inner.refresh_tokens.retain(|_, g| g.account_id != account.id);
    done("Logged out.")
}

async fn profile(State(state): State<Shared>, realm: Realm, headers: HeaderMap) -> Response {
    let inner = state.inner.lock().await;
    match inner.bearer(&headers, realm) {
        Some(account) => data(account.profile()),
        None => failure(StatusCode::UNAUTHORIZED, "Unauthenticated."),
    }
}

async fn delete_account(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<DeleteAccountBody>,
) -> Response {
    let mut inner = state.inner.lock().await;
    let Some(account) = inner.bearer(&headers, Realm::Customer) else {
        return failure(StatusCode::UNAUTHORIZED, "Unauthenticated.");
    };
    if account.password != body.password {
        return invalid("password", "The password is incorrect.");
    }

    inner.accounts.retain(|a| a.id != account.id);
    inner.access_tokens.retain(|_, g| g.account_id != account.id);
    inner.refresh_tokens.retain(|_, g| g.account_id != account.id);
    done("Account deleted.")
}

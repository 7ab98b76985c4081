//! Admin and customer authentication contexts.
//!
//! An [`AuthManager`] owns one realm's token pair and cached profile and runs
//! the session state machine:
//!
//! ```text
//! Unauthenticated --login--> Authenticated
//! Authenticated --access expired--> Refreshing --ok--> Authenticated
//!                                              \--err--> Unauthenticated (+ redirect)
//! Authenticated --refresh expired--> Unauthenticated (+ redirect)
//! Authenticated --logout--> Unauthenticated
//! ```
//!
//! Tokens and the profile are persisted to [`Storage`](crate::storage::Storage)
//! under realm-specific keys so a restart can [`restore`](AuthManager::restore)
//! the session. Checks and refreshes are serialized: at most one refresh is in
//! flight per manager.

mod error;
mod realm;
mod token;

pub use error::AuthError;
pub use realm::{AuthRealm, UnknownRealm};
pub use token::{EXPIRY_SKEW_SECS, TokenPair, TokenStatus, is_expired_at, token_expiry};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use copperpot_core::Email;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, Credentials, RegisterRequest, TokenGrant, UserProfile};
use crate::error::{auth_user_message, clear_sentry_user, report_api, report_auth, set_sentry_user};
use crate::notify::{SharedNotifier, Toast};
use crate::storage::SharedStorage;

/// Backend operations an [`AuthManager`] needs.
///
/// Implemented by [`ApiClient`](crate::api::ApiClient); tests supply mocks.
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for tokens.
    fn login(
        &self,
        realm: AuthRealm,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenGrant, ApiError>> + Send;

    /// Create an account and sign it in.
    fn register(
        &self,
        realm: AuthRealm,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<TokenGrant, ApiError>> + Send;

    /// Exchange a refresh token for a new pair.
    fn refresh(
        &self,
        realm: AuthRealm,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<TokenGrant, ApiError>> + Send;

    /// Revoke the session server-side.
    fn logout(
        &self,
        realm: AuthRealm,
        access_token: &SecretString,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch the signed-in profile.
    fn profile(
        &self,
        realm: AuthRealm,
        access_token: &SecretString,
    ) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;

    /// Delete the signed-in account.
    fn delete_account(
        &self,
        realm: AuthRealm,
        access_token: &SecretString,
        password: &SecretString,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Where a realm's session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No usable session.
    Unauthenticated,
    /// A refresh is in flight.
    Refreshing,
    /// Tokens are valid.
    Authenticated,
}

#[derive(Default)]
struct Session {
    tokens: Option<TokenPair>,
    profile: Option<UserProfile>,
}

const EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Floor for the expiry watch period; `tokio::time::interval` rejects zero.
const MIN_WATCH_PERIOD: Duration = Duration::from_millis(10);

/// Session state for one realm.
pub struct AuthManager<B> {
    realm: AuthRealm,
    backend: B,
    storage: SharedStorage,
    notifier: SharedNotifier,
    session: RwLock<Session>,
    phase: watch::Sender<AuthPhase>,
    refresh_lock: Mutex<()>,
}

impl<B: AuthBackend> AuthManager<B> {
    /// Create a signed-out manager. Call [`restore`](Self::restore) to pick
    /// up a persisted session.
    #[must_use]
    pub fn new(
        realm: AuthRealm,
        backend: B,
        storage: SharedStorage,
        notifier: SharedNotifier,
    ) -> Self {
        let (phase, _) = watch::channel(AuthPhase::Unauthenticated);
        Self {
            realm,
            backend,
            storage,
            notifier,
            session: RwLock::new(Session::default()),
            phase,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Realm this manager serves.
    #[must_use]
    pub const fn realm(&self) -> AuthRealm {
        self.realm
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        *self.phase.borrow()
    }

    /// Whether the realm is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase() == AuthPhase::Authenticated
    }

    /// Watch phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthPhase> {
        self.phase.subscribe()
    }

    /// Current access token, without checking expiry.
    pub async fn access_token(&self) -> Option<SecretString> {
        self.session
            .read()
            .await
            .tokens
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    /// Cached profile of the signed-in user.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.session.read().await.profile.clone()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Load persisted tokens and profile, then run [`check_session`](Self::check_session).
    #[instrument(skip(self), fields(realm = %self.realm))]
    pub async fn restore(&self) -> AuthPhase {
        let tokens = self.load_tokens();
        if tokens.is_none() {
            debug!("No persisted session");
            self.phase.send_replace(AuthPhase::Unauthenticated);
            return AuthPhase::Unauthenticated;
        }

        let profile = self.load_profile();
        {
            let mut session = self.session.write().await;
            session.tokens = tokens;
            session.profile = profile;
        }
        self.phase.send_replace(AuthPhase::Authenticated);
        self.check_session().await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingField` for bad
    /// input, `AuthError::InvalidCredentials` if the backend rejects them,
    /// and `AuthError::Api` for other backend failures.
    #[instrument(skip(self, password), fields(realm = %self.realm))]
    pub async fn login(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<UserProfile, AuthError> {
        let result = self.try_login(email, password).await;
        self.toast_result(&result, |profile| {
            format!("Welcome back, {}!", display_name(profile))
        });
        result
    }

    async fn try_login(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let credentials = Credentials { email, password };
        let grant = self
            .backend
            .login(self.realm, &credentials)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        self.establish(grant).await
    }

    /// Create a customer account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unsupported` for the admin realm, validation
    /// errors for bad input, and `AuthError::Api` if the backend refuses.
    #[instrument(skip(self, password), fields(realm = %self.realm))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: SecretString,
    ) -> Result<UserProfile, AuthError> {
        let result = self.try_register(name, email, phone, password).await;
        self.toast_result(&result, |_| "Your account has been created.".to_string());
        result
    }

    async fn try_register(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: SecretString,
    ) -> Result<UserProfile, AuthError> {
        if self.realm.register_path().is_none() {
            return Err(AuthError::Unsupported {
                realm: self.realm,
                operation: "registration",
            });
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;

        let request = RegisterRequest {
            name: name.to_string(),
            email,
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            password,
        };
        let grant = self.backend.register(self.realm, &request).await?;
        self.establish(grant).await
    }

    /// Run the expiry state machine once.
    ///
    /// Refreshes an expired access token, ends the session when the refresh
    /// token has expired, and does nothing while tokens are valid.
    #[instrument(skip(self), fields(realm = %self.realm))]
    pub async fn check_session(&self) -> AuthPhase {
        let _guard = self.refresh_lock.lock().await;

        let Some(tokens) = self.session.read().await.tokens.clone() else {
            self.phase.send_replace(AuthPhase::Unauthenticated);
            return AuthPhase::Unauthenticated;
        };

        match tokens.status() {
            TokenStatus::Valid => {
                self.phase.send_replace(AuthPhase::Authenticated);
                AuthPhase::Authenticated
            }
            TokenStatus::AccessExpired => match self.refresh_locked(&tokens).await {
                Ok(()) => AuthPhase::Authenticated,
                Err(_) => AuthPhase::Unauthenticated,
            },
            TokenStatus::Expired => {
                info!("Refresh token expired, ending session");
                self.expire().await;
                AuthPhase::Unauthenticated
            }
        }
    }

    /// Exchange the refresh token for a new pair now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` without a session and
    /// `AuthError::SessionExpired` if the refresh fails (the session is then
    /// cleared and the user redirected to sign in).
    #[instrument(skip(self), fields(realm = %self.realm))]
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        let tokens = self
            .session
            .read()
            .await
            .tokens
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;
        self.refresh_locked(&tokens).await
    }

    /// Refresh unless another caller already replaced `stale_access`.
    async fn refresh_if_current(&self, stale_access: &SecretString) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        let tokens = self
            .session
            .read()
            .await
            .tokens
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;
        if tokens.access_token.expose_secret() != stale_access.expose_secret() {
            return Ok(());
        }
        self.refresh_locked(&tokens).await
    }

    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        if tokens.status() == TokenStatus::Expired {
            self.expire().await;
            return Err(AuthError::SessionExpired);
        }

        self.phase.send_replace(AuthPhase::Refreshing);
        match self.backend.refresh(self.realm, &tokens.refresh_token).await {
            Ok(grant) => {
                let fresh = TokenPair::new(grant.access_token, grant.refresh_token);
                self.persist_tokens(&fresh);
                {
                    let mut session = self.session.write().await;
                    session.tokens = Some(fresh);
                    if let Some(profile) = grant.user {
                        self.persist_profile(&profile);
                        session.profile = Some(profile);
                    }
                }
                self.phase.send_replace(AuthPhase::Authenticated);
                debug!("Tokens refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                report_api(&e);
                self.expire().await;
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Fetch the profile from the backend, refreshing once on a 401.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` without a session,
    /// `AuthError::SessionExpired` if the retry refresh fails, and
    /// `AuthError::Api` for other backend failures.
    #[instrument(skip(self), fields(realm = %self.realm))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let result = self.try_fetch_profile().await;
        if let Err(e) = &result {
            report_auth(e);
        }
        result
    }

    async fn try_fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let access = self.access_token().await.ok_or(AuthError::NotAuthenticated)?;

        let profile = match self.backend.profile(self.realm, &access).await {
            Ok(profile) => profile,
            Err(e) if e.is_unauthorized() => {
                debug!("Profile request unauthorized, refreshing once");
                self.refresh_if_current(&access).await?;
                let access = self.access_token().await.ok_or(AuthError::NotAuthenticated)?;
                self.backend.profile(self.realm, &access).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.persist_profile(&profile);
        self.session.write().await.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Sign out. The backend call is best-effort; local state is always cleared.
    #[instrument(skip(self), fields(realm = %self.realm))]
    pub async fn logout(&self) {
        if let Some(access) = self.access_token().await {
            if let Err(e) = self.backend.logout(self.realm, &access).await {
                warn!(error = %e, "Backend logout failed, clearing local session anyway");
            }
        }
        self.clear_session().await;
        self.notifier.notify(Toast::info("You have been signed out."));
    }

    /// Delete the signed-in customer account, then clear the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unsupported` for the admin realm,
    /// `AuthError::NotAuthenticated` without a session, and `AuthError::Api`
    /// if the backend refuses (e.g. wrong password).
    #[instrument(skip(self, password), fields(realm = %self.realm))]
    pub async fn delete_account(&self, password: SecretString) -> Result<(), AuthError> {
        let result = self.try_delete_account(password).await;
        self.toast_result(&result, |_| "Your account has been deleted.".to_string());
        result
    }

    async fn try_delete_account(&self, password: SecretString) -> Result<(), AuthError> {
        if self.realm.delete_account_path().is_none() {
            return Err(AuthError::Unsupported {
                realm: self.realm,
                operation: "account deletion",
            });
        }
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let access = self.access_token().await.ok_or(AuthError::NotAuthenticated)?;

        self.backend
            .delete_account(self.realm, &access, &password)
            .await?;
        self.clear_session().await;
        info!("Account deleted");
        Ok(())
    }

    /// Run [`check_session`](Self::check_session) every `period` until the
    /// returned handle is aborted. The first check happens after one period.
    /// Periods shorter than 10ms are raised to 10ms.
    pub fn spawn_expiry_watch(self: Arc<Self>, period: Duration) -> JoinHandle<()>
    where
        B: 'static,
    {
        let period = period.max(MIN_WATCH_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let phase = self.check_session().await;
                debug!(realm = %self.realm, ?phase, "Session check");
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn establish(&self, grant: TokenGrant) -> Result<UserProfile, AuthError> {
        let tokens = TokenPair::new(grant.access_token, grant.refresh_token);
        let profile = match grant.user {
            Some(profile) => profile,
            None => self.backend.profile(self.realm, &tokens.access_token).await?,
        };

        self.persist_tokens(&tokens);
        self.persist_profile(&profile);
        {
            let mut session = self.session.write().await;
            session.tokens = Some(tokens);
            session.profile = Some(profile.clone());
        }
        self.phase.send_replace(AuthPhase::Authenticated);

        set_sentry_user(&profile.id, Some(profile.email.as_str()));
        info!(user_id = %profile.id, "Signed in");
        Ok(profile)
    }

    /// End the session and send the user to sign in again.
    async fn expire(&self) {
        self.clear_session().await;
        self.notifier.notify(Toast::error(EXPIRED_MESSAGE));
        self.notifier.redirect(self.realm.login_route());
    }

    async fn clear_session(&self) {
        {
            let mut session = self.session.write().await;
            session.tokens = None;
            session.profile = None;
        }
        for key in [
            self.realm.access_token_key(),
            self.realm.refresh_token_key(),
            self.realm.profile_key(),
        ] {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(error = %e, key, "Failed to remove auth state from storage");
            }
        }
        clear_sentry_user();
        self.phase.send_replace(AuthPhase::Unauthenticated);
    }

    fn load_tokens(&self) -> Option<TokenPair> {
        let read = |key: &str| match self.storage.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, key, "Failed to read token from storage");
                None
            }
        };
        let access = read(self.realm.access_token_key())?;
        let refresh = read(self.realm.refresh_token_key())?;
        Some(TokenPair::new(
            SecretString::from(access),
            SecretString::from(refresh),
        ))
    }

    fn load_profile(&self) -> Option<UserProfile> {
        let raw = self.storage.get_item(self.realm.profile_key()).ok()??;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(error = %e, "Stored profile is corrupt, ignoring"))
            .ok()
    }

    fn persist_tokens(&self, tokens: &TokenPair) {
        let writes = [
            (self.realm.access_token_key(), &tokens.access_token),
            (self.realm.refresh_token_key(), &tokens.refresh_token),
        ];
        for (key, token) in writes {
            if let Err(e) = self.storage.set_item(key, token.expose_secret()) {
                warn!(error = %e, key, "Failed to persist token");
            }
        }
    }

    fn persist_profile(&self, profile: &UserProfile) {
        let result = serde_json::to_string(profile)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set_item(self.realm.profile_key(), &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist profile");
        }
    }

    fn toast_result<T>(&self, result: &Result<T, AuthError>, success: impl FnOnce(&T) -> String) {
        let toast = match result {
            Ok(value) => Toast::success(success(value)),
            Err(e) => {
                report_auth(e);
                Toast::error(auth_user_message(e))
            }
        };
        self.notifier.notify(toast);
    }
}

fn display_name(profile: &UserProfile) -> &str {
    if profile.name.trim().is_empty() {
        profile.email.as_str()
    } else {
        profile.name.as_str()
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    if password.chars().count() < RegisterRequest::MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {} characters.",
            RegisterRequest::MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

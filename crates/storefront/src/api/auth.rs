//! Customer and admin auth endpoints.
//!
//! Paths differ per realm; see [`AuthRealm`].

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::{ApiClient, ApiError, Credentials, RegisterRequest, TokenGrant, UserProfile};
use crate::auth::{AuthBackend, AuthRealm};

impl ApiClient {
    fn unsupported(realm: AuthRealm, operation: &str) -> ApiError {
        ApiError::NotFound(format!("{operation} is not available for {realm} accounts"))
    }
}

impl AuthBackend for ApiClient {
    #[instrument(skip(self, credentials), fields(realm = %realm, email = %credentials.email))]
    async fn login(
        &self,
        realm: AuthRealm,
        credentials: &Credentials,
    ) -> Result<TokenGrant, ApiError> {
        let url = self.endpoint(realm.login_path())?;
        self.send(self.http().post(url).json(&credentials.to_json()))
            .await
    }

    #[instrument(skip(self, request), fields(realm = %realm, email = %request.email))]
    async fn register(
        &self,
        realm: AuthRealm,
        request: &RegisterRequest,
    ) -> Result<TokenGrant, ApiError> {
        let path = realm
            .register_path()
            .ok_or_else(|| Self::unsupported(realm, "registration"))?;
        let url = self.endpoint(path)?;
        self.send(self.http().post(url).json(&request.to_json()))
            .await
    }

    #[instrument(skip(self, refresh_token), fields(realm = %realm))]
    async fn refresh(
        &self,
        realm: AuthRealm,
        refresh_token: &SecretString,
    ) -> Result<TokenGrant, ApiError> {
        let url = self.endpoint(realm.refresh_path())?;
        let body = serde_json::json!({ "refresh_token": refresh_token.expose_secret() });
        self.send(self.http().post(url).json(&body)).await
    }

    #[instrument(skip(self, access_token), fields(realm = %realm))]
    async fn logout(&self, realm: AuthRealm, access_token: &SecretString) -> Result<(), ApiError> {
        let url = self.endpoint(realm.logout_path())?;
        self.send_empty(
            self.http()
                .post(url)
                .bearer_auth(access_token.expose_secret()),
        )
        .await
    }

    #[instrument(skip(self, access_token), fields(realm = %realm))]
    async fn profile(
        &self,
        realm: AuthRealm,
        access_token: &SecretString,
    ) -> Result<UserProfile, ApiError> {
        let url = self.endpoint(realm.profile_path())?;
        self.send(
            self.http()
                .get(url)
                .bearer_auth(access_token.expose_secret()),
        )
        .await
    }

    #[instrument(skip(self, access_token, password), fields(realm = %realm))]
    async fn delete_account(
        &self,
        realm: AuthRealm,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let path = realm
            .delete_account_path()
            .ok_or_else(|| Self::unsupported(realm, "account deletion"))?;
        let url = self.endpoint(path)?;
        let body = serde_json::json!({ "password": password.expose_secret() });
        self.send_empty(
            self.http()
                .post(url)
                .bearer_auth(access_token.expose_secret())
                .json(&body),
        )
        .await
    }
}

//! REST client for the storefront backend.
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared behind an `Arc`, cheap to clone
//! - The backend is the source of truth: no local sync, direct API calls
//! - Responses arrive in an envelope, `{ "success"?, "message"?, "data" }`;
//!   [`ApiClient::send`] unwraps it and maps HTTP failures onto [`ApiError`]
//!
//! Endpoint groups live in their own files and implement the backend traits
//! the stores are generic over:
//!
//! - `cart` - [`CartBackend`](crate::cart::CartBackend)
//! - `auth` - [`AuthBackend`](crate::auth::AuthBackend)
//! - `delivery` - [`DeliveryBackend`](crate::delivery::DeliveryBackend)

mod auth;
mod cart;
mod delivery;
pub mod types;

pub use types::*;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::StorefrontConfig;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// 401/403: missing, invalid or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 404: the resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400/422: the backend rejected the input.
    #[error("Validation failed: {message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field messages, when the backend sends them.
        fields: BTreeMap<String, Vec<String>>,
    },

    /// 429: rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the body, or the status reason.
        message: String,
    },

    /// A 2xx response with `"success": false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A 2xx response without the `data` the endpoint promises.
    #[error("Response contained no data")]
    MissingData,
}

impl ApiError {
    /// Whether the backend rejected our credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the resource was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the failure is on our side of the wire or the server's, as
    /// opposed to a problem with the user's input or credentials.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Parse(_)
                | Self::InvalidUrl(_)
                | Self::Server { .. }
                | Self::MissingData
        )
    }
}

/// Success envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Error body, parsed leniently.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

/// Map a non-success status and its body onto an [`ApiError`].
fn error_from_status(status: StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
            message,
            fields: parsed.errors,
        },
        _ => ApiError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent("Copperpot/1.0");
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config.api_url.clone()))
    }

    /// Create a client for `base_url` with default HTTP settings.
    #[must_use]
    pub fn with_base_url(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        // Url::join replaces the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        }
    }

    /// Backend base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Resolve an endpoint path and append a `session_id` query parameter.
    fn session_endpoint(&self, path: &str, session_id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("session_id", session_id);
        Ok(url)
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Send a request and unwrap the envelope's `data`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send_envelope(request).await?;
        envelope.data.ok_or(ApiError::MissingData)
    }

    /// Send a request whose response may or may not carry `data`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let envelope: Envelope<T> = self.send_envelope(request).await?;
        Ok(envelope.data)
    }

    /// Send a request whose response data is irrelevant.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let _: Envelope<serde_json::Value> = self.send_envelope(request).await?;
        Ok(())
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(error_from_status(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Envelope {
                success: None,
                message: None,
                data: None,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })?;

        if envelope.success == Some(false) {
            return Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }

        Ok(envelope)
    }
}

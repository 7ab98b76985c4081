//! Bearer token pairs and expiry checks.
//!
//! Expiry comes from the JWT `exp` claim. The payload is decoded without
//! verifying the signature: the backend verifies tokens, the client only
//! needs to know when to refresh.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Seconds before `exp` at which a token already counts as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// An access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access_token: SecretString,
    /// Long-lived token used to obtain new access tokens.
    pub refresh_token: SecretString,
}

/// Where a token pair stands at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// The access token is usable.
    Valid,
    /// The access token is expired but the refresh token is not.
    AccessExpired,
    /// The refresh token is expired; the session is over.
    Expired,
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT.
///
/// Returns `None` for opaque (non-JWT) tokens and tokens without `exp`.
#[must_use]
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return None;
    };

    // Some issuers pad their base64; the URL-safe engine here does not accept it.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp?, 0)
}

/// Whether a token is expired (or within [`EXPIRY_SKEW_SECS`] of it) at `now`.
///
/// Tokens without a readable expiry never expire client-side; the backend's
/// 401 decides for them.
#[must_use]
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token)
        .is_some_and(|exp| now.timestamp() >= exp.timestamp() - EXPIRY_SKEW_SECS)
}

impl TokenPair {
    /// Create a pair.
    #[must_use]
    pub const fn new(access_token: SecretString, refresh_token: SecretString) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    /// Classify the pair at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        if is_expired_at(self.refresh_token.expose_secret(), now) {
            TokenStatus::Expired
        } else if is_expired_at(self.access_token.expose_secret(), now) {
            TokenStatus::AccessExpired
        } else {
            TokenStatus::Valid
        }
    }

    /// Classify the pair now.
    #[must_use]
    pub fn status(&self) -> TokenStatus {
        self.status_at(Utc::now())
    }

    /// Expiry of the access token, if readable.
    #[must_use]
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        token_expiry(self.access_token.expose_secret())
    }

    /// Expiry of the refresh token, if readable.
    #[must_use]
    pub fn refresh_expires_at(&self) -> Option<DateTime<Utc>> {
        token_expiry(self.refresh_token.expose_secret())
    }
}

//! Authentication error types.

use thiserror::Error;

use super::AuthRealm;
use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] copperpot_core::EmailError),

    /// Password too short or empty.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Required registration field missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The backend rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No signed-in session for the realm.
    #[error("not signed in")]
    NotAuthenticated,

    /// The session's refresh token has expired, or refreshing failed.
    #[error("session expired")]
    SessionExpired,

    /// The operation does not exist for this realm.
    #[error("{operation} is not available for {realm} accounts")]
    Unsupported {
        /// Realm the operation was attempted in.
        realm: AuthRealm,
        /// Operation name.
        operation: &'static str,
    },

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Whether the failure is the backend's rather than the user's.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_side(),
            _ => false,
        }
    }
}

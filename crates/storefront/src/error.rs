//! Unified error handling with Sentry integration.
//!
//! Every layer has its own error enum; [`StorefrontError`] unifies them for
//! callers of the [`Storefront`](crate::context::Storefront) facade.
//! [`StorefrontError::user_message`] is what a toast may show: internal
//! details never reach the user. [`report`] sends server-class failures to
//! Sentry (a no-op unless the binary initialized Sentry).

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout details were incomplete or checkout is not configured.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Generic message for failures the user can only retry.
pub const RETRY_MESSAGE: &str = "Something went wrong. Please try again.";

/// Toast text for an API failure.
#[must_use]
pub fn api_user_message(err: &ApiError) -> String {
    match err {
        ApiError::Validation { message, .. } | ApiError::Rejected(message) => message.clone(),
        ApiError::NotFound(_) => "That item is no longer available.".to_string(),
        ApiError::Unauthorized(_) => "Please sign in again.".to_string(),
        ApiError::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
        ApiError::Http(_)
        | ApiError::Parse(_)
        | ApiError::InvalidUrl(_)
        | ApiError::Server { .. }
        | ApiError::MissingData => RETRY_MESSAGE.to_string(),
    }
}

/// Toast text for an auth failure.
#[must_use]
pub fn auth_user_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::MissingField(field) => format!("Please fill in your {field}."),
        AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
        AuthError::NotAuthenticated => "Please sign in to continue.".to_string(),
        AuthError::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
        AuthError::Unsupported { .. } => "This action is not available.".to_string(),
        AuthError::Api(api) => api_user_message(api),
    }
}

impl StorefrontError {
    /// Message safe to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => api_user_message(err),
            Self::Auth(err) => auth_user_message(err),
            Self::Checkout(err) => err.to_string(),
            Self::Config(_) | Self::Storage(_) => RETRY_MESSAGE.to_string(),
        }
    }

    /// Whether the failure is ours or the backend's rather than the user's.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_side(),
            Self::Auth(err) => err.is_server_side(),
            Self::Config(_) | Self::Storage(_) => true,
            Self::Checkout(_) => false,
        }
    }
}

/// Log an error and capture it to Sentry if it is server-side.
pub fn report(err: &StorefrontError) {
    report_error(err, err.is_server_side());
}

/// [`report`] for an auth failure.
pub fn report_auth(err: &AuthError) {
    report_error(err, err.is_server_side());
}

/// [`report`] for a bare API failure.
pub fn report_api(err: &ApiError) {
    report_error(err, err.is_server_side());
}

fn report_error<E: std::error::Error + ?Sized>(err: &E, server_side: bool) {
    if server_side {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Storefront error");
    } else {
        tracing::debug!(error = %err, "Storefront error (user-facing)");
    }
}

/// Set the Sentry user context after a successful sign-in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_use_generic_message() {
        let err = StorefrontError::Api(ApiError::Server {
            status: 500,
            message: "SQLSTATE[42S02]: table not found".to_string(),
        });
        assert_eq!(err.user_message(), RETRY_MESSAGE);
        assert!(err.is_server_side());
    }

    #[test]
    fn test_validation_message_is_shown() {
        let err = StorefrontError::Api(ApiError::Validation {
            message: "Quantity exceeds stock".to_string(),
            fields: std::collections::BTreeMap::new(),
        });
        assert_eq!(err.user_message(), "Quantity exceeds stock");
        assert!(!err.is_server_side());
    }

    #[test]
    fn test_auth_messages() {
        let err = StorefrontError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.user_message(), "Invalid email or password.");

        let err = StorefrontError::Auth(AuthError::Api(ApiError::MissingData));
        assert!(err.is_server_side());
    }

    #[test]
    fn test_display() {
        let err = StorefrontError::Checkout(CheckoutError::EmptyCart);
        assert_eq!(err.to_string(), "Checkout error: Your cart is empty.");
        assert_eq!(err.user_message(), "Your cart is empty.");
    }

    #[test]
    fn test_report_captures_server_errors_only() {
        let events = sentry::test::with_captured_events(|| {
            report(&StorefrontError::Api(ApiError::Server {
                status: 502,
                message: "bad gateway".to_string(),
            }));
            report_auth(&AuthError::InvalidCredentials);
            report_api(&ApiError::NotFound("Cart item not found".to_string()));
            report_auth(&AuthError::Api(ApiError::MissingData));
        });
        assert_eq!(events.len(), 2);
    }
}

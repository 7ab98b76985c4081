//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COPPERPOT_API_URL` - Base URL of the storefront REST backend
//!
//! ## Optional
//! - `COPPERPOT_STORAGE_PATH` - JSON file for client-side state (default: .copperpot/storage.json)
//! - `COPPERPOT_WHATSAPP_NUMBER` - Store's WhatsApp number; checkout is disabled without it
//! - `COPPERPOT_CURRENCY` - Currency label for order messages (default: USD)
//! - `COPPERPOT_SESSION_CHECK_SECS` - Auth expiry check interval (default: 120, clamped to 60..=300)
//! - `COPPERPOT_HTTP_TIMEOUT_SECS` - HTTP request timeout (default: none)
//! - `COPPERPOT_DELIVERY_CACHE_SECS` - Delivery location cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use copperpot_core::PhoneNumber;
use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".copperpot/storage.json";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_SESSION_CHECK_SECS: u64 = 120;
const MIN_SESSION_CHECK_SECS: u64 = 60;
const MAX_SESSION_CHECK_SECS: u64 = 300;
const DEFAULT_DELIVERY_CACHE_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront SDK configuration.
///
/// Implements `Debug` manually to redact the Sentry DSN, which embeds a key.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// File holding session id, wishlist and auth tokens
    pub storage_path: PathBuf,
    /// Store's WhatsApp number for checkout
    pub whatsapp_number: Option<PhoneNumber>,
    /// Currency label, e.g. "USD"
    pub currency: String,
    /// How often the auth expiry watch runs
    pub session_check_interval: Duration,
    /// Per-request HTTP timeout; `None` waits indefinitely
    pub http_timeout: Option<Duration>,
    /// How long delivery locations stay cached
    pub delivery_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("storage_path", &self.storage_path)
            .field("whatsapp_number", &self.whatsapp_number)
            .field("currency", &self.currency)
            .field("session_check_interval", &self.session_check_interval)
            .field("http_timeout", &self.http_timeout)
            .field("delivery_cache_ttl", &self.delivery_cache_ttl)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Configuration with defaults for everything but the backend URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            whatsapp_number: None,
            currency: DEFAULT_CURRENCY.to_string(),
            session_check_interval: Duration::from_secs(DEFAULT_SESSION_CHECK_SECS),
            http_timeout: None,
            delivery_cache_ttl: Duration::from_secs(DEFAULT_DELIVERY_CACHE_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let api_url = env.required("COPPERPOT_API_URL")?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("COPPERPOT_API_URL".to_string(), e.to_string()))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "COPPERPOT_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let storage_path = PathBuf::from(env.or_default("COPPERPOT_STORAGE_PATH", DEFAULT_STORAGE_PATH));

        let whatsapp_number = env
            .optional("COPPERPOT_WHATSAPP_NUMBER")
            .map(|raw| {
                PhoneNumber::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("COPPERPOT_WHATSAPP_NUMBER".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let currency = env.or_default("COPPERPOT_CURRENCY", DEFAULT_CURRENCY);
        let currency = validate_currency(&currency)?;

        let check_secs = env
            .parsed::<u64>("COPPERPOT_SESSION_CHECK_SECS")?
            .unwrap_or(DEFAULT_SESSION_CHECK_SECS)
            .clamp(MIN_SESSION_CHECK_SECS, MAX_SESSION_CHECK_SECS);

        let http_timeout = env
            .parsed::<u64>("COPPERPOT_HTTP_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let delivery_cache_secs = env
            .parsed::<u64>("COPPERPOT_DELIVERY_CACHE_SECS")?
            .unwrap_or(DEFAULT_DELIVERY_CACHE_SECS);

        Ok(Self {
            api_url,
            storage_path,
            whatsapp_number,
            currency,
            session_check_interval: Duration::from_secs(check_secs),
            http_timeout,
            delivery_cache_ttl: Duration::from_secs(delivery_cache_secs),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get and parse an optional variable.
    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Currency labels are three ASCII letters, stored uppercase.
fn validate_currency(value: &str) -> Result<String, ConfigError> {
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(value.to_ascii_uppercase())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "COPPERPOT_CURRENCY".to_string(),
            format!("expected a three-letter currency code, got '{value}'"),
        ))
    }
}

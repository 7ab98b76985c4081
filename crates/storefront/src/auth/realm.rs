//! Admin and customer sign-in realms.
//!
//! Both realms run the same token state machine; they differ in endpoints,
//! storage keys and where an expired session is sent to sign in again.

use core::fmt;
use core::str::FromStr;

use crate::storage::keys;

/// Which kind of account a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRealm {
    /// Shop customers.
    Customer,
    /// Dashboard administrators.
    Admin,
}

impl AuthRealm {
    /// `POST` endpoint for email/password sign-in.
    #[must_use]
    pub const fn login_path(self) -> &'static str {
        match self {
            Self::Customer => "customer/auth/login",
            Self::Admin => "auth/login",
        }
    }

    /// `POST` endpoint for account creation (customers only).
    #[must_use]
    pub const fn register_path(self) -> Option<&'static str> {
        match self {
            Self::Customer => Some("customer/auth/register"),
            Self::Admin => None,
        }
    }

    /// `POST` endpoint exchanging a refresh token for new tokens.
    #[must_use]
    pub const fn refresh_path(self) -> &'static str {
        match self {
            Self::Customer => "customer/auth/refresh",
            Self::Admin => "auth/refresh",
        }
    }

    /// `POST` endpoint revoking the current tokens.
    #[must_use]
    pub const fn logout_path(self) -> &'static str {
        match self {
            Self::Customer => "customer/auth/logout",
            Self::Admin => "auth/logout",
        }
    }

    /// `GET` endpoint returning the signed-in profile.
    #[must_use]
    pub const fn profile_path(self) -> &'static str {
        match self {
            Self::Customer => "customer/auth/profile",
            Self::Admin => "auth/profile",
        }
    }

    /// `POST` endpoint deleting the account (customers only).
    #[must_use]
    pub const fn delete_account_path(self) -> Option<&'static str> {
        match self {
            Self::Customer => Some("customer/auth/delete-account"),
            Self::Admin => None,
        }
    }

    /// Storage key of the access token.
    #[must_use]
    pub const fn access_token_key(self) -> &'static str {
        match self {
            Self::Customer => keys::CUSTOMER_ACCESS_TOKEN,
            Self::Admin => keys::ADMIN_ACCESS_TOKEN,
        }
    }

    /// Storage key of the refresh token.
    #[must_use]
    pub const fn refresh_token_key(self) -> &'static str {
        match self {
            Self::Customer => keys::CUSTOMER_REFRESH_TOKEN,
            Self::Admin => keys::ADMIN_REFRESH_TOKEN,
        }
    }

    /// Storage key of the cached profile.
    #[must_use]
    pub const fn profile_key(self) -> &'static str {
        match self {
            Self::Customer => keys::CUSTOMER_USER,
            Self::Admin => keys::ADMIN_USER,
        }
    }

    /// Route an expired session is redirected to.
    #[must_use]
    pub const fn login_route(self) -> &'static str {
        match self {
            Self::Customer => "/login",
            Self::Admin => "/admin/login",
        }
    }

    /// Lowercase name, used in logs and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthRealm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`AuthRealm`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown realm '{0}' (expected 'customer' or 'admin')")]
pub struct UnknownRealm(String);

impl FromStr for AuthRealm {
    type Err = UnknownRealm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRealm(other.to_string())),
        }
    }
}

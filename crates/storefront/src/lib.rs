//! Copperpot storefront client-state SDK.
//!
//! Everything a storefront UI keeps on the client side: the guest session
//! id, a locally stored wishlist, the server-backed cart, admin and customer
//! sign-in with token refresh, delivery locations and WhatsApp checkout.
//! [`Storefront`] wires them together over one storage backend and one
//! [`ApiClient`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod notify;
pub mod session;
pub mod storage;
pub mod wishlist;

pub use api::{ApiClient, ApiError};
pub use config::StorefrontConfig;
pub use context::Storefront;
pub use error::{Result, StorefrontError};

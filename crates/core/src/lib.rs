//! Copperpot Core - Shared types library.
//!
//! This crate provides the domain types shared by the Copperpot components:
//! - `storefront` - Client-state SDK for the kitchenware storefront
//! - `cli` - Command-line front end for the SDK
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phone
//!   numbers and product snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

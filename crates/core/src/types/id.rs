//! Newtype IDs for backend entity references.
//!
//! The storefront backend hands out integer keys for products, carts, cart
//! lines and delivery locations. Wrapping each in its own type keeps a cart
//! line id from being passed where a product id is expected.

/// Macro to define a type-safe ID wrapper around an `i64` backend key.
///
/// Generated types are `Copy`, hashable, serialize transparently and parse
/// from strings (so they can be taken straight from CLI arguments).
///
/// # Example
///
/// ```rust
/// # use copperpot_core::define_id;
/// define_id!(OrderId);
/// define_id!(InvoiceId);
///
/// let order = OrderId::new(7);
/// assert_eq!(order.as_i64(), 7);
/// assert_eq!("7".parse::<OrderId>().unwrap(), order);
///
/// // Distinct types, so this won't compile:
/// // let _: InvoiceId = order;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from a backend key.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying backend key.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(DeliveryLocationId);
define_id!(UserId);

//! Wire types for the storefront backend.

use copperpot_core::{
    CartId, CartItemId, DeliveryLocationId, Email, Price, ProductId, ProductSnapshot, UserId,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Cart
// ─────────────────────────────────────────────────────────────────────────────

/// The server-side cart for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Backend cart id (absent until the first item is added).
    #[serde(default)]
    pub id: Option<CartId>,
    /// Session the cart belongs to.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Line items in the order the backend returns them.
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Total computed by the backend, if it sends one.
    #[serde(default)]
    pub total: Option<Price>,
}

impl Cart {
    /// An empty cart for a session.
    #[must_use]
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of line totals, computed locally.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// The backend's total, or the local subtotal when it sends none.
    #[must_use]
    pub fn total(&self) -> Price {
        self.total.unwrap_or_else(|| self.subtotal())
    }

    /// Find a line by id.
    #[must_use]
    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Find the line holding a product.
    #[must_use]
    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line id.
    pub id: CartItemId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Units of the product.
    pub quantity: u32,
    /// Product details as the backend denormalized them.
    pub product: ProductSnapshot,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Body of `POST /cart/items`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddCartItemRequest<'a> {
    pub session_id: &'a str,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `PUT /cart/items/:id`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateCartItemRequest<'a> {
    pub session_id: &'a str,
    pub quantity: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery
// ─────────────────────────────────────────────────────────────────────────────

/// A delivery area and its fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLocation {
    /// Location id.
    pub id: DeliveryLocationId,
    /// Display name, e.g. "Westlands".
    pub name: String,
    /// Delivery fee charged for this location.
    pub fee: Price,
    /// Inactive locations are hidden from checkout.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// A signed-in user's profile (customer or admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Phone number, if on file.
    #[serde(default)]
    pub phone: Option<String>,
    /// Admin role (absent for customers).
    #[serde(default)]
    pub role: Option<String>,
}

/// Tokens (and possibly the profile) returned by login, register and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// Short-lived bearer token.
    #[serde(deserialize_with = "deserialize_secret")]
    pub access_token: SecretString,
    /// Long-lived token used to obtain new access tokens.
    #[serde(deserialize_with = "deserialize_secret")]
    pub refresh_token: SecretString,
    /// Usually "Bearer".
    #[serde(default)]
    pub token_type: Option<String>,
    /// Profile, when the endpoint includes it.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Email and password sign-in.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email.
    pub email: Email,
    /// Account password.
    pub password: SecretString,
}

impl Credentials {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "email": self.email,
            "password": self.password.expose_secret(),
        })
    }
}

/// Customer registration.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// Full name.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Phone number, optional at registration.
    pub phone: Option<String>,
    /// Chosen password.
    pub password: SecretString,
}

impl RegisterRequest {
    /// Minimum password length the backend accepts.
    pub const MIN_PASSWORD_LENGTH: usize = 8;

    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "password": self.password.expose_secret(),
            "password_confirmation": self.password.expose_secret(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i64, product: i64, price: i64, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            quantity,
            product: ProductSnapshot::new(ProductId::new(product), "Item", Price::from_units(price)),
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart {
            items: vec![line(1, 10, 1000, 2), line(2, 11, 250, 1)],
            ..Cart::default()
        };

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::from_units(2250));
        assert_eq!(cart.total(), Price::from_units(2250));
    }

    #[test]
    fn test_cart_prefers_backend_total() {
        let cart = Cart {
            items: vec![line(1, 10, 1000, 1)],
            total: Some(Price::from_units(900)),
            ..Cart::default()
        };
        assert_eq!(cart.total(), Price::from_units(900));
    }

    #[test]
    fn test_cart_lookup() {
        let cart = Cart {
            items: vec![line(5, 42, 10, 1)],
            ..Cart::default()
        };

        assert!(cart.item(CartItemId::new(5)).is_some());
        assert!(cart.item(CartItemId::new(6)).is_none());
        assert_eq!(
            cart.item_for_product(ProductId::new(42)).map(|i| i.id),
            Some(CartItemId::new(5))
        );
    }

    #[test]
    fn test_cart_from_backend_json() {
        let json = r#"{
            "id": 7,
            "session_id": "s1",
            "items": [
                {"id": 1, "product_id": 3, "quantity": 2,
                 "product": {"id": 3, "name": "Dutch Oven", "price": "4500.00", "image": null}}
            ],
            "total": "9000.00"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.id, Some(CartId::new(7)));
        assert_eq!(cart.items[0].line_total(), Price::from_units(9000));
        assert_eq!(cart.total(), Price::from_units(9000));
    }

    #[test]
    fn test_delivery_location_defaults_active() {
        let json = r#"{"id": 1, "name": "CBD", "fee": 200}"#;
        let location: DeliveryLocation = serde_json::from_str(json).unwrap();
        assert!(location.is_active);
    }

    #[test]
    fn test_register_request_confirms_password() {
        let request = RegisterRequest {
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: None,
            password: SecretString::from("correct horse".to_string()),
        };
        let json = request.to_json();
        assert_eq!(json["password"], json["password_confirmation"]);
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_token_grant_debug_redacts_tokens() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"acc-secret","refresh_token":"ref-secret","token_type":"Bearer"}"#,
        )
        .unwrap();
        let debug = format!("{grant:?}");
        assert!(!debug.contains("acc-secret"));
        assert!(!debug.contains("ref-secret"));
    }
}

//! Product snapshots carried by carts and wishlists.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A denormalized copy of a catalog product, taken when it was added to a
/// cart or wishlist.
///
/// Snapshots are not re-validated against the live catalog; a renamed or
/// repriced product keeps its old details until it is added again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Catalog product id.
    pub id: ProductId,
    /// Product name at add time.
    pub name: String,
    /// Unit price at add time.
    pub price: Price,
    /// Primary image URL, if the product had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot without an image.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: None,
        }
    }

    /// Attach an image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_backend_json() {
        let json = r#"{"id": 1, "name": "Pan", "price": 1000, "image": null}"#;
        let product: ProductSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(product, ProductSnapshot::new(ProductId::new(1), "Pan", Price::from_units(1000)));
    }

    #[test]
    fn test_snapshot_omits_missing_image() {
        let product = ProductSnapshot::new(ProductId::new(2), "Skillet", Price::from_units(80));
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("image").is_none());

        let with_image = product.with_image("https://cdn.copperpot.shop/skillet.jpg");
        assert_eq!(
            with_image.image.as_deref(),
            Some("https://cdn.copperpot.shop/skillet.jpg")
        );
    }
}

//! Cart endpoints.

use copperpot_core::{CartItemId, ProductId};
use tracing::instrument;

use super::{AddCartItemRequest, ApiClient, ApiError, Cart, UpdateCartItemRequest};
use crate::cart::CartBackend;

impl ApiClient {
    /// Responses that omit the cart (some deletes do) are followed by a fetch.
    async fn cart_or_fetch(&self, cart: Option<Cart>, session_id: &str) -> Result<Cart, ApiError> {
        match cart {
            Some(cart) => Ok(cart),
            None => self.fetch_cart(session_id).await,
        }
    }
}

impl CartBackend for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
        let url = self.session_endpoint("cart", session_id)?;
        let cart: Option<Cart> = self.send_optional(self.http().get(url)).await?;
        Ok(cart.unwrap_or_else(|| Cart::empty(session_id)))
    }

    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    async fn add_item(
        &self,
        session_id: &str,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint("cart/items")?;
        let body = AddCartItemRequest {
            session_id,
            product_id,
            quantity,
        };
        let cart = self.send_optional(self.http().post(url).json(&body)).await?;
        self.cart_or_fetch(cart, session_id).await
    }

    #[instrument(skip(self), fields(item_id = %item_id, quantity))]
    async fn update_item(
        &self,
        session_id: &str,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint(&format!("cart/items/{item_id}"))?;
        let body = UpdateCartItemRequest {
            session_id,
            quantity,
        };
        let cart = self.send_optional(self.http().put(url).json(&body)).await?;
        self.cart_or_fetch(cart, session_id).await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn remove_item(&self, session_id: &str, item_id: CartItemId) -> Result<Cart, ApiError> {
        let url = self.session_endpoint(&format!("cart/items/{item_id}"), session_id)?;
        let cart = self.send_optional(self.http().delete(url)).await?;
        self.cart_or_fetch(cart, session_id).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
        let url = self.session_endpoint("cart", session_id)?;
        let cart: Option<Cart> = self.send_optional(self.http().delete(url)).await?;
        Ok(cart.unwrap_or_else(|| Cart::empty(session_id)))
    }
}

//! Cart commands.

use clap::Subcommand;
use copperpot_core::{CartItemId, ProductId};
use copperpot_storefront::Storefront;

use super::print_cart;

#[derive(Subcommand)]
pub enum CartAction {
    /// Fetch and print the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: ProductId,
        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line (0 removes it)
    Update {
        /// Cart line id
        item_id: CartItemId,
        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Cart line id
        item_id: CartItemId,
    },
    /// Remove whichever line holds a product
    RemoveProduct {
        /// Product id
        product_id: ProductId,
    },
    /// Empty the cart
    Clear,
}

/// Run a cart command and print the resulting cart.
///
/// # Errors
///
/// Returns an error if the backend rejects the change or cannot be reached.
pub async fn run(
    storefront: &Storefront,
    action: CartAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let cart = storefront.cart();
    let cart = match action {
        CartAction::Show => cart.refresh().await?,
        CartAction::Add { product_id, quantity } => cart.add_item(product_id, quantity).await?,
        CartAction::Update { item_id, quantity } => cart.update_item(item_id, quantity).await?,
        CartAction::Remove { item_id } => cart.remove_item(item_id).await?,
        CartAction::RemoveProduct { product_id } => cart.remove_product(product_id).await?,
        CartAction::Clear => cart.clear().await?,
    };

    print_cart(&cart, &storefront.config().currency);
    Ok(())
}

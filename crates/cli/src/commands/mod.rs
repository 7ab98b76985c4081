//! CLI subcommands.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod delivery;
pub mod wishlist;

use copperpot_core::Price;
use copperpot_storefront::api::Cart;

/// Print a cart as a table of lines and a total.
pub fn print_cart(cart: &Cart, currency: &str) {
    if cart.is_empty() {
        println!("Cart is empty.");
        return;
    }

    for item in &cart.items {
        println!(
            "#{:<6} {:>3} x {:<40} {}",
            item.id,
            item.quantity,
            item.product.name,
            money(item.line_total(), currency)
        );
    }
    println!("{} item(s), total {}", cart.item_count(), money(cart.total(), currency));
}

/// Format a price with the configured currency.
pub fn money(price: Price, currency: &str) -> String {
    price.display_with(currency)
}

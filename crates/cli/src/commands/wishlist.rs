//! Wishlist commands.
//!
//! The wishlist lives in local storage only; none of these commands touch
//! the backend.

use clap::Subcommand;
use copperpot_core::{Price, ProductId, ProductSnapshot};
use copperpot_storefront::Storefront;
use copperpot_storefront::wishlist::Wishlist;
use rust_decimal::Decimal;

use super::money;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// List wishlisted products
    List,
    /// Add a product
    Add(ProductArgs),
    /// Add the product if absent, otherwise remove it
    Toggle(ProductArgs),
    /// Remove a product
    Remove {
        /// Product id
        product_id: ProductId,
    },
    /// Remove every product
    Clear,
}

#[derive(clap::Args)]
pub struct ProductArgs {
    /// Product id
    product_id: ProductId,

    /// Product name
    #[arg(short, long)]
    name: String,

    /// Unit price, e.g. 1250.00
    #[arg(short, long)]
    price: Decimal,

    /// Image URL
    #[arg(long)]
    image: Option<String>,
}

impl ProductArgs {
    fn snapshot(self) -> ProductSnapshot {
        let product = ProductSnapshot::new(self.product_id, self.name, Price::new(self.price));
        match self.image {
            Some(image) => product.with_image(image),
            None => product,
        }
    }
}

/// Run a wishlist command. Storage problems fall back to an empty list.
pub fn run(storefront: &Storefront, action: WishlistAction) {
    let wishlist = storefront.wishlist();
    let currency = &storefront.config().currency;

    match action {
        WishlistAction::List => print(&wishlist.wishlist(), currency),
        WishlistAction::Add(args) => print(&wishlist.add(&args.snapshot()), currency),
        WishlistAction::Toggle(args) => {
            let product = args.snapshot();
            let present = wishlist.toggle(&product);
            println!(
                "{} {} the wishlist.",
                product.name,
                if present { "is now in" } else { "was removed from" }
            );
        }
        WishlistAction::Remove { product_id } => print(&wishlist.remove(product_id), currency),
        WishlistAction::Clear => print(&wishlist.clear(), currency),
    }
}

fn print(wishlist: &Wishlist, currency: &str) {
    if wishlist.is_empty() {
        println!("Wishlist is empty.");
        return;
    }
    for item in wishlist.items() {
        println!(
            "{:<8} {:<40} {:>14}  added {}",
            item.product_id,
            item.product.name,
            money(item.product.price, currency),
            item.added_at.format("%Y-%m-%d %H:%M")
        );
    }
}

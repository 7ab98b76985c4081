//! WhatsApp checkout.

use copperpot_core::DeliveryLocationId;
use copperpot_storefront::Storefront;
use copperpot_storefront::checkout::CheckoutDetails;

use super::money;

#[derive(clap::Args)]
pub struct CheckoutArgs {
    /// Recipient name
    #[arg(short = 'n', long)]
    full_name: String,

    /// Contact number
    #[arg(short, long)]
    phone: String,

    /// Street address or landmark
    #[arg(short, long)]
    address: String,

    /// Delivery location id (see `copperpot delivery`)
    #[arg(short = 'l', long)]
    location: DeliveryLocationId,

    /// Delivery instructions
    #[arg(long)]
    notes: Option<String>,
}

impl From<CheckoutArgs> for CheckoutDetails {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            full_name: args.full_name,
            phone: args.phone,
            address: args.address,
            delivery_location_id: Some(args.location),
            notes: args.notes,
        }
    }
}

/// Build the order link, print it and the message, and clear the cart.
///
/// # Errors
///
/// Returns an error if the details are invalid, the cart is empty or the
/// backend cannot be reached.
pub async fn run(
    storefront: &Storefront,
    args: CheckoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let details = CheckoutDetails::from(args);
    let link = storefront.checkout(&details).await?;
    let currency = &storefront.config().currency;

    println!("{}", link.message);
    println!();
    println!("Total: {}", money(link.totals.total, currency));
    println!("Open to send: {}", link.url);
    Ok(())
}

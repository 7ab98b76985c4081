//! Delivery location listing.

use copperpot_storefront::Storefront;

use super::money;

/// Print delivery locations. Inactive ones are included only with `all`.
///
/// # Errors
///
/// Returns an error if the locations cannot be fetched.
pub async fn list(storefront: &Storefront, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let locations = if all {
        storefront.delivery().all().await?.as_ref().clone()
    } else {
        storefront.delivery().active().await?
    };

    if locations.is_empty() {
        println!("No delivery locations.");
        return Ok(());
    }

    let currency = &storefront.config().currency;
    for location in &locations {
        println!(
            "{:<6} {:<30} {:>14}{}",
            location.id,
            location.name,
            money(location.fee, currency),
            if location.is_active { "" } else { "  (inactive)" }
        );
    }
    Ok(())
}

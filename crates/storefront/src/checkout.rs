//! WhatsApp checkout.
//!
//! There is no payment step: checkout validates the customer's details,
//! renders the cart as a plain-text order and hands it to WhatsApp through a
//! `wa.me` link pre-filled with that text. The store confirms the order in
//! the chat.

use core::fmt;
use std::fmt::Write as _;

use copperpot_core::{DeliveryLocationId, PhoneNumber, Price};
use thiserror::Error;
use url::Url;

use crate::api::{Cart, DeliveryLocation};

/// One problem with the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field, e.g. `"phone"`.
    pub field: &'static str,
    /// Message for the user.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Reasons a checkout cannot go ahead.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more form fields are missing or invalid.
    #[error("{}", join_messages(.0))]
    InvalidDetails(Vec<FieldError>),

    /// The cart has no items.
    #[error("Your cart is empty.")]
    EmptyCart,

    /// The chosen delivery location is unknown or inactive.
    #[error("The selected delivery location is not available.")]
    UnknownDeliveryLocation,

    /// No WhatsApp number is configured for the store.
    #[error("Checkout is not available right now.")]
    WhatsAppNotConfigured,

    /// The order link could not be built.
    #[error("Could not build the order link: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CheckoutError {
    /// The invalid fields, if this is a validation failure.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::InvalidDetails(fields) => fields,
            _ => &[],
        }
    }
}

fn join_messages(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// What the customer enters at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Recipient name.
    pub full_name: String,
    /// Contact number.
    pub phone: String,
    /// Street address or landmark.
    pub address: String,
    /// Chosen delivery location.
    pub delivery_location_id: Option<DeliveryLocationId>,
    /// Free-text instructions.
    pub notes: Option<String>,
}

impl CheckoutDetails {
    /// Check every field and report all problems at once.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidDetails` listing each missing or
    /// invalid field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("full_name", "Full name is required."));
        }

        if self.phone.trim().is_empty() {
            errors.push(FieldError::new("phone", "Phone number is required."));
        } else if PhoneNumber::parse(&self.phone).is_err() {
            errors.push(FieldError::new(
                "phone",
                format!(
                    "Enter a valid phone number ({}-{} digits).",
                    PhoneNumber::MIN_DIGITS,
                    PhoneNumber::MAX_DIGITS
                ),
            ));
        }

        if self.address.trim().is_empty() {
            errors.push(FieldError::new("address", "Delivery address is required."));
        }

        if self.delivery_location_id.is_none() {
            errors.push(FieldError::new(
                "delivery_location",
                "Choose a delivery location.",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::InvalidDetails(errors))
        }
    }

    fn notes(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Subtotal, delivery fee and total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    /// Items total.
    pub subtotal: Price,
    /// Delivery fee for the chosen location.
    pub delivery_fee: Price,
    /// Amount due.
    pub total: Price,
}

impl OrderTotals {
    /// Totals for `cart` delivered to `location`.
    #[must_use]
    pub fn new(cart: &Cart, location: &DeliveryLocation) -> Self {
        let subtotal = cart.total();
        Self {
            subtotal,
            delivery_fee: location.fee,
            total: subtotal + location.fee,
        }
    }
}

/// Render the order as the text of a WhatsApp message.
#[must_use]
pub fn order_message(
    cart: &Cart,
    details: &CheckoutDetails,
    location: &DeliveryLocation,
    currency: &str,
) -> String {
    let totals = OrderTotals::new(cart, location);
    let money = |price: Price| price.display_with(currency);

    // Writing to a String cannot fail.
    let mut msg = String::from("New order from Copperpot\n\n");
    let _ = writeln!(msg, "Name: {}", details.full_name.trim());
    let _ = writeln!(msg, "Phone: {}", details.phone.trim());
    let _ = writeln!(msg, "Address: {}", details.address.trim());
    let _ = writeln!(msg, "Delivery location: {}", location.name);

    msg.push_str("\nItems:\n");
    for item in &cart.items {
        let _ = writeln!(
            msg,
            "{} x {} @ {} = {}",
            item.quantity,
            item.product.name,
            money(item.product.price),
            money(item.line_total()),
        );
    }

    let _ = writeln!(msg, "\nSubtotal: {}", money(totals.subtotal));
    let _ = writeln!(msg, "Delivery fee: {}", money(totals.delivery_fee));
    let _ = write!(msg, "Total: {}", money(totals.total));

    if let Some(notes) = details.notes() {
        let _ = write!(msg, "\n\nNotes: {notes}");
    }

    msg
}

/// Build a `wa.me` link that opens a chat with `number`, pre-filled with
/// `message`.
///
/// # Errors
///
/// Returns an error if the resulting URL does not parse.
pub fn whatsapp_url(number: &PhoneNumber, message: &str) -> Result<Url, CheckoutError> {
    let url = format!(
        "https://wa.me/{}?text={}",
        number.digits(),
        urlencoding::encode(message)
    );
    Ok(Url::parse(&url)?)
}

/// A checkout ready to hand off.
#[derive(Debug, Clone)]
pub struct CheckoutLink {
    /// Message text.
    pub message: String,
    /// `wa.me` link carrying the message.
    pub url: Url,
    /// Amounts in the message.
    pub totals: OrderTotals,
}

/// Validate and build the WhatsApp link for a cart.
///
/// # Errors
///
/// Returns `CheckoutError` if the store has no WhatsApp number, the cart is
/// empty, the details are invalid or the location does not match.
pub fn prepare(
    whatsapp_number: Option<&PhoneNumber>,
    cart: &Cart,
    details: &CheckoutDetails,
    location: Option<&DeliveryLocation>,
    currency: &str,
) -> Result<CheckoutLink, CheckoutError> {
    let number = whatsapp_number.ok_or(CheckoutError::WhatsAppNotConfigured)?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    details.validate()?;

    let location = location
        .filter(|l| details.delivery_location_id == Some(l.id) && l.is_active)
        .ok_or(CheckoutError::UnknownDeliveryLocation)?;

    let message = order_message(cart, details, location, currency);
    let url = whatsapp_url(number, &message)?;
    Ok(CheckoutLink {
        totals: OrderTotals::new(cart, location),
        message,
        url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use copperpot_core::{CartItemId, ProductId, ProductSnapshot};

    use super::*;
    use crate::api::CartItem;

    fn cart() -> Cart {
        Cart {
            items: vec![
                CartItem {
                    id: CartItemId::new(1),
                    product_id: ProductId::new(1),
                    quantity: 2,
                    product: ProductSnapshot::new(
                        ProductId::new(1),
                        "Copper Saute Pan",
                        Price::from_units(1000),
                    ),
                },
                CartItem {
                    id: CartItemId::new(2),
                    product_id: ProductId::new(2),
                    quantity: 1,
                    product: ProductSnapshot::new(
                        ProductId::new(2),
                        "Wooden Spoon & Rest",
                        Price::from_units(250),
                    ),
                },
            ],
            ..Cart::default()
        }
    }

    fn location() -> DeliveryLocation {
        DeliveryLocation {
            id: DeliveryLocationId::new(4),
            name: "Westlands".to_string(),
            fee: Price::from_units(200),
            is_active: true,
        }
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            full_name: "Amina Odhiambo".to_string(),
            phone: "+254 712 345 678".to_string(),
            address: "14 Riverside Drive".to_string(),
            delivery_location_id: Some(DeliveryLocationId::new(4)),
            notes: Some("Call on arrival".to_string()),
        }
    }

    fn store_number() -> PhoneNumber {
        PhoneNumber::parse("+254 700 111 222").unwrap()
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let err = CheckoutDetails::default().validate().unwrap_err();

        let fields: Vec<_> = err.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["full_name", "phone", "address", "delivery_location"]);
    }

    #[test]
    fn test_validate_rejects_bad_phone() {
        let details = CheckoutDetails {
            phone: "12345".to_string(),
            ..details()
        };
        let err = details.validate().unwrap_err();
        assert_eq!(err.fields().len(), 1);
        assert_eq!(err.fields()[0].field, "phone");
        assert!(err.to_string().contains("7-15 digits"));
    }

    #[test]
    fn test_valid_details() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn test_order_message() {
        let msg = order_message(&cart(), &details(), &location(), "KES");

        assert!(msg.contains("Name: Amina Odhiambo"));
        assert!(msg.contains("Delivery location: Westlands"));
        assert!(msg.contains("2 x Copper Saute Pan @ KES 1,000.00 = KES 2,000.00"));
        assert!(msg.contains("1 x Wooden Spoon & Rest @ KES 250.00 = KES 250.00"));
        assert!(msg.contains("Subtotal: KES 2,250.00"));
        assert!(msg.contains("Delivery fee: KES 200.00"));
        assert!(msg.contains("Total: KES 2,450.00"));
        assert!(msg.ends_with("Notes: Call on arrival"));
    }

    #[test]
    fn test_order_message_without_notes() {
        let details = CheckoutDetails {
            notes: Some("   ".to_string()),
            ..details()
        };
        let msg = order_message(&cart(), &details, &location(), "USD");
        assert!(!msg.contains("Notes:"));
        assert!(msg.ends_with("Total: USD 2,450.00"));
    }

    #[test]
    fn test_whatsapp_url_is_percent_encoded() {
        let url = whatsapp_url(&store_number(), "2 x Pan & Lid\nTotal: 10").unwrap();

        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/254700111222");
        assert_eq!(url.query(), Some("text=2%20x%20Pan%20%26%20Lid%0ATotal%3A%2010"));

        let text: Vec<_> = url.query_pairs().collect();
        assert_eq!(text[0].1, "2 x Pan & Lid\nTotal: 10");
    }

    #[test]
    fn test_prepare() {
        let link = prepare(Some(&store_number()), &cart(), &details(), Some(&location()), "USD")
            .unwrap();
        assert_eq!(link.totals.total, Price::from_units(2450));
        assert!(link.url.as_str().starts_with("https://wa.me/254700111222?text="));
    }

    #[test]
    fn test_prepare_failures() {
        assert!(matches!(
            prepare(None, &cart(), &details(), Some(&location()), "USD").unwrap_err(),
            CheckoutError::WhatsAppNotConfigured
        ));
        assert!(matches!(
            prepare(Some(&store_number()), &Cart::default(), &details(), Some(&location()), "USD")
                .unwrap_err(),
            CheckoutError::EmptyCart
        ));
        assert!(matches!(
            prepare(Some(&store_number()), &cart(), &details(), None, "USD").unwrap_err(),
            CheckoutError::UnknownDeliveryLocation
        ));
    }
}

//! Checkout rules: shipping form, shipping cost and order drafts.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::{Email, EmailError, PaymentMethod, Price, ProductId};

/// Orders at or above this subtotal ship for free.
pub const FREE_SHIPPING_THRESHOLD: u64 = 500_000;

/// Flat shipping fee below [`FREE_SHIPPING_THRESHOLD`].
pub const FLAT_SHIPPING_FEE: u64 = 25_000;

/// Shipping cost for a cart subtotal.
#[must_use]
pub fn shipping_cost(subtotal: Price) -> Price {
    if subtotal >= Price::from_rupiah(FREE_SHIPPING_THRESHOLD) {
        Price::ZERO
    } else {
        Price::from_rupiah(FLAT_SHIPPING_FEE)
    }
}

/// Shipping address as stored on the order (JSON column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
}

/// Why a checkout was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("your cart is empty")]
    EmptyCart,
    /// A required shipping field was blank.
    #[error("please complete all shipping details (missing {0})")]
    MissingField(&'static str),
    /// The contact email is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Checkout form as posted by the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "postalCode")]
    pub postal_code: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    /// A form with name and email filled in from the customer's profile.
    ///
    /// The name falls back to the local part of the email when the profile
    /// has no full name.
    #[must_use]
    pub fn prefilled(full_name: Option<&str>, email: &Email) -> Self {
        let name = full_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.local_part());
        Self {
            name: name.to_owned(),
            email: email.as_str().to_owned(),
            ..Self::default()
        }
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns the first blank required field, or [`CheckoutError::InvalidEmail`].
    pub fn validate(&self) -> Result<ValidCheckout, CheckoutError> {
        let field = |value: &str, name: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(CheckoutError::MissingField(name))
            } else {
                Ok(value.to_owned())
            }
        };

        let name = field(&self.name, "name")?;
        let email = Email::parse(&self.email)?;
        let address = ShippingAddress {
            name,
            phone: field(&self.phone, "phone")?,
            address: field(&self.address, "address")?,
            city: field(&self.city, "city")?,
            postal_code: field(&self.postal_code, "postal_code")?,
        };

        Ok(ValidCheckout {
            email,
            address,
            payment_method: self.payment_method,
        })
    }
}

/// A validated checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub email: Email,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Subtotal, shipping and grand total for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Price,
    pub shipping: Price,
    pub grand_total: Price,
}

impl Totals {
    /// Compute totals for `cart`.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.total();
        let shipping = shipping_cost(subtotal);
        Self {
            subtotal,
            shipping,
            grand_total: subtotal + shipping,
        }
    }
}

/// One order item, copied from a cart line at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineDraft {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub size: String,
}

/// Everything needed to write an order header and its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: ShippingAddress,
    /// Display name of the payment method, as stored on the order.
    pub payment_method: String,
    pub totals: Totals,
    pub lines: Vec<OrderLineDraft>,
}

impl OrderDraft {
    /// Build an order from the cart and a posted form.
    ///
    /// The order's `total` is the grand total including shipping.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] for an empty cart, otherwise any form
    /// validation error.
    pub fn build(cart: &Cart, form: &CheckoutForm) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let valid = form.validate()?;

        let lines = cart
            .lines()
            .iter()
            .map(|line| OrderLineDraft {
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: line.product.price,
                size: line.size.clone(),
            })
            .collect();

        Ok(Self {
            customer_name: valid.address.name.clone(),
            customer_email: valid.email,
            shipping_address: valid.address,
            payment_method: valid.payment_method.display_name().to_owned(),
            totals: Totals::for_cart(cart),
            lines,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cart::ProductSnapshot;
    use crate::catalog::tests::{category, product};

    fn cart_with(price: u64, quantity: u32) -> Cart {
        let cat = category("tops");
        let mut cart = Cart::new();
        cart.add_quantity(
            ProductSnapshot::from(&product("Tee", &cat, price)),
            "M",
            quantity,
        );
        cart
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Budi Santoso".into(),
            email: "budi@example.co.id".into(),
            phone: "081234567890".into(),
            address: "Jl. Sudirman 1".into(),
            city: "Jakarta".into(),
            postal_code: "10220".into(),
            payment_method: PaymentMethod::EWallet,
        }
    }

    #[test]
    fn test_shipping_cost_threshold() {
        assert_eq!(shipping_cost(Price::from_rupiah(499_999)), Price::from_rupiah(25_000));
        assert_eq!(shipping_cost(Price::from_rupiah(500_000)), Price::ZERO);
        assert_eq!(shipping_cost(Price::ZERO), Price::from_rupiah(25_000));
    }

    #[test]
    fn test_totals() {
        let totals = Totals::for_cart(&cart_with(150_000, 2));
        assert_eq!(totals.subtotal, Price::from_rupiah(300_000));
        assert_eq!(totals.grand_total, Price::from_rupiah(325_000));

        let totals = Totals::for_cart(&cart_with(250_000, 2));
        assert_eq!(totals.shipping, Price::ZERO);
        assert_eq!(totals.grand_total, Price::from_rupiah(500_000));
    }

    #[test]
    fn test_prefill_falls_back_to_email_local_part() {
        let email = Email::parse("rina@example.com").unwrap();
        assert_eq!(CheckoutForm::prefilled(None, &email).name, "rina");
        assert_eq!(CheckoutForm::prefilled(Some("  "), &email).name, "rina");
        let form = CheckoutForm::prefilled(Some("Rina W"), &email);
        assert_eq!(form.name, "Rina W");
        assert_eq!(form.email, "rina@example.com");
    }

    #[test]
    fn test_validate_requires_shipping_fields() {
        let mut f = form();
        f.city = "   ".into();
        assert_eq!(f.validate(), Err(CheckoutError::MissingField("city")));

        let mut f = form();
        f.postal_code = String::new();
        assert_eq!(f.validate(), Err(CheckoutError::MissingField("postal_code")));

        let mut f = form();
        f.email = "not-an-email".into();
        assert!(matches!(f.validate(), Err(CheckoutError::InvalidEmail(_))));
    }

    #[test]
    fn test_build_order_draft() {
        let draft = OrderDraft::build(&cart_with(100_000, 3), &form()).unwrap();
        assert_eq!(draft.customer_name, "Budi Santoso");
        assert_eq!(draft.payment_method, "E-Wallet - GoPay");
        assert_eq!(draft.totals.grand_total, Price::from_rupiah(325_000));
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.lines[0].quantity, 3);
        assert_eq!(draft.lines[0].size, "M");
    }

    #[test]
    fn test_build_rejects_empty_cart() {
        assert_eq!(
            OrderDraft::build(&Cart::new(), &form()),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_shipping_address_json_uses_postal_code_key() {
        let valid = form().validate().unwrap();
        let json = serde_json::to_value(&valid.address).unwrap();
        assert_eq!(json["postalCode"], "10220");
        assert!(json.get("postal_code").is_none());
    }
}

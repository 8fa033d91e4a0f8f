//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use urban_style_core::checkout::ShippingAddress;
use urban_style_core::reports::{OrderItemSummary, OrderSummary};
use urban_style_core::{OrderNumber, OrderStatus, Price, ProductId, UserId};

/// A line of a placed order.
///
/// Name and price are copied at checkout so later catalog edits do not
/// rewrite order history. `product_id` is cleared if the product is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    pub size: String,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// A placed order (header plus items).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderNumber,
    pub customer_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub subtotal: Price,
    pub shipping_cost: Price,
    /// Grand total including shipping.
    pub total: Price,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    /// Payment method display name.
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Total number of units ordered.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Reporting view of this order.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id.clone(),
            customer_name: self.customer_name.clone(),
            customer_email: self.customer_email.clone(),
            status: self.status,
            total: self.total,
            created_at: self.created_at,
            items: self
                .items
                .iter()
                .map(|item| OrderItemSummary {
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.price,
                    size: item.size.clone(),
                })
                .collect(),
        }
    }
}

//! Checkout service: the prefilled checkout form and order placement.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use urban_style_core::PaymentMethod;
use urban_style_core::cart::CartSummary;
use urban_style_core::checkout::{CheckoutError, CheckoutForm, OrderDraft, Totals};

use super::cart::{CartError, CartStore, DbCartStore};
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::models::{CurrentUser, Order};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The cart or form was rejected.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The cart could not be read.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One selectable payment method.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// What the checkout page needs: the prefilled form, the cart and totals.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub form: CheckoutForm,
    pub cart: CartSummary,
    pub totals: Totals,
    pub payment_methods: Vec<PaymentOption>,
}

/// Checkout service for a signed-in user.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Prefilled form and totals for `user`'s server cart.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError` if the user or cart cannot be loaded.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn summary(&self, user: &CurrentUser) -> Result<CheckoutSummary, PlaceOrderError> {
        let profile = UserRepository::new(self.pool).get_by_id(user.id).await?;
        let full_name = profile.as_ref().and_then(|p| p.full_name.as_deref());
        let cart = DbCartStore::new(self.pool.clone(), user.id).load().await?;

        Ok(CheckoutSummary {
            form: CheckoutForm::prefilled(full_name, &user.email),
            totals: Totals::for_cart(&cart),
            cart: cart.summary(),
            payment_methods: PaymentMethod::ALL
                .iter()
                .map(|m| PaymentOption {
                    value: m.as_str(),
                    label: m.display_name(),
                })
                .collect(),
        })
    }

    /// Turn `user`'s server cart into a pending order and take the ordered
    /// lines out of the cart.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Checkout` for an empty cart or an invalid
    /// form, `PlaceOrderError::Repository` if the order cannot be written.
    #[instrument(skip(self, user, form), fields(user_id = %user.id))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        form: &CheckoutForm,
    ) -> Result<Order, PlaceOrderError> {
        let cart = DbCartStore::new(self.pool.clone(), user.id).load().await?;
        let draft = OrderDraft::build(&cart, form)?;

        let order = OrderRepository::new(self.pool).place(user.id, &draft).await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.item_count(),
            "Order placed"
        );
        Ok(order)
    }
}

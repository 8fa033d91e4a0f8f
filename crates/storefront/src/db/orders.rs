//! Order repository (`orders` + `order_items`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use urban_style_core::checkout::{OrderDraft, ShippingAddress};
use urban_style_core::{OrderNumber, OrderStatus, Price, ProductId, UserId};

use super::{RepositoryError, non_negative, to_db_int};
use crate::models::{Order, OrderItem};

/// How many fresh order numbers to try before giving up.
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

const ORDER_COLUMNS: &str = "id, customer_id, customer_name, customer_email, subtotal, \
                             shipping_cost, total, status, shipping_address, payment_method, \
                             created_at";

/// Internal row type for order headers.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: Option<Uuid>,
    customer_name: String,
    customer_email: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    status: OrderStatus,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    created_at: DateTime<Utc>,
}

/// Internal row type for order items.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: String,
    product_id: Option<Uuid>,
    product_name: String,
    quantity: i32,
    price: Decimal,
    size: String,
}

fn price(amount: Decimal, what: &str) -> Result<Price, RepositoryError> {
    Price::new(amount).map_err(|e| RepositoryError::DataCorruption(format!("{what}: {e}")))
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            quantity: non_negative(row.quantity, "quantity")?,
            price: price(row.price, "order item price")?,
            size: row.size,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let id = OrderNumber::parse(&self.id)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Order {
            id,
            customer_id: self.customer_id.map(UserId::new),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            subtotal: price(self.subtotal, "order subtotal")?,
            shipping_cost: price(self.shipping_cost, "order shipping")?,
            total: price(self.total, "order total")?,
            status: self.status,
            shipping_address: self.shipping_address.0,
            payment_method: self.payment_method,
            created_at: self.created_at,
            items,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Place an order for `customer_id` and take the ordered units out of
    /// their server cart.
    ///
    /// The header, the items and the cart update commit together. Cart lines
    /// that are not part of `draft`, and units added to a line after the
    /// draft was built, stay in the cart. A fresh
    /// order number is drawn for each attempt; a collision with an existing
    /// number rolls back and retries, up to [`MAX_ORDER_NUMBER_ATTEMPTS`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if every attempt collided,
    /// `RepositoryError::Database` for other failures.
    #[tracing::instrument(skip(self, draft), fields(lines = draft.lines.len()))]
    pub async fn place(
        &self,
        customer_id: UserId,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError> {
        self.place_with(customer_id, draft, || OrderNumber::generate(Utc::now()))
            .await
    }

    async fn place_with(
        &self,
        customer_id: UserId,
        draft: &OrderDraft,
        mut next_number: impl FnMut() -> OrderNumber + Send,
    ) -> Result<Order, RepositoryError> {
        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let id = next_number();
            let mut tx = self.pool.begin().await?;

            match insert_order(&mut tx, &id, customer_id, draft).await {
                Ok(()) => {
                    remove_ordered_lines(&mut tx, customer_id, draft).await?;
                    tx.commit().await?;

                    return self.get(&id).await?.ok_or(RepositoryError::NotFound);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tx.rollback().await?;
                    tracing::warn!(order_id = %id, attempt, "Order number collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(RepositoryError::Conflict(
            "could not allocate a unique order number".to_owned(),
        ))
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: &OrderNumber,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get one order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &OrderNumber) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(&self, customer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// All orders, newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Orders created in `[from, until)`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at DESC, id
            "
        ))
        .bind(from)
        .bind(until)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Load the items of `rows` in one query and build the orders.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, product_name, quantity, price, size
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id.clone();
            items_by_order
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

/// Subtract the ordered quantities from the customer's cart inside `tx`.
///
/// Lines left with nothing are deleted; the rest keep the difference.
async fn remove_ordered_lines(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: UserId,
    draft: &OrderDraft,
) -> Result<(), RepositoryError> {
    let mut product_ids = Vec::with_capacity(draft.lines.len());
    let mut sizes = Vec::with_capacity(draft.lines.len());
    let mut quantities = Vec::with_capacity(draft.lines.len());

    for line in &draft.lines {
        product_ids.push(line.product_id.as_uuid());
        sizes.push(line.size.as_str());
        quantities.push(to_db_int(line.quantity, "quantity")?);
    }

    sqlx::query(
        r"
        DELETE FROM cart_items ci
        USING UNNEST($2::uuid[], $3::text[], $4::int4[]) AS o(product_id, size, quantity)
        WHERE ci.user_id = $1
          AND ci.product_id = o.product_id
          AND ci.size = o.size
          AND ci.quantity <= o.quantity
        ",
    )
    .bind(customer_id)
    .bind(&product_ids)
    .bind(&sizes)
    .bind(&quantities)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r"
        UPDATE cart_items ci
        SET quantity = ci.quantity - o.quantity, updated_at = now()
        FROM UNNEST($2::uuid[], $3::text[], $4::int4[]) AS o(product_id, size, quantity)
        WHERE ci.user_id = $1
          AND ci.product_id = o.product_id
          AND ci.size = o.size
        ",
    )
    .bind(customer_id)
    .bind(&product_ids)
    .bind(&sizes)
    .bind(&quantities)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Insert the header and items of one order inside `tx`.
///
/// A primary key collision on the order number surfaces as
/// `RepositoryError::Conflict`.
async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    id: &OrderNumber,
    customer_id: UserId,
    draft: &OrderDraft,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO orders (
            id, customer_id, customer_name, customer_email,
            subtotal, shipping_cost, total, status,
            shipping_address, payment_method
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(id)
    .bind(customer_id)
    .bind(&draft.customer_name)
    .bind(draft.customer_email.as_str())
    .bind(draft.totals.subtotal)
    .bind(draft.totals.shipping)
    .bind(draft.totals.grand_total)
    .bind(OrderStatus::Pending)
    .bind(Json(&draft.shipping_address))
    .bind(&draft.payment_method)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::conflict_on_unique(e, "order number already used"))?;

    let mut product_ids = Vec::with_capacity(draft.lines.len());
    let mut names = Vec::with_capacity(draft.lines.len());
    let mut quantities = Vec::with_capacity(draft.lines.len());
    let mut prices = Vec::with_capacity(draft.lines.len());
    let mut sizes = Vec::with_capacity(draft.lines.len());
    let mut positions = Vec::with_capacity(draft.lines.len());

    for (position, line) in draft.lines.iter().enumerate() {
        product_ids.push(line.product_id.as_uuid());
        names.push(line.product_name.as_str());
        quantities.push(to_db_int(line.quantity, "quantity")?);
        prices.push(line.unit_price.amount());
        sizes.push(line.size.as_str());
        positions.push(i32::try_from(position).unwrap_or(i32::MAX));
    }

    sqlx::query(
        r"
        INSERT INTO order_items (order_id, product_id, product_name, quantity, price, size, position)
        SELECT $1, * FROM UNNEST($2::uuid[], $3::text[], $4::int4[], $5::numeric[], $6::text[], $7::int4[])
        ",
    )
    .bind(id)
    .bind(&product_ids)
    .bind(&names)
    .bind(&quantities)
    .bind(&prices)
    .bind(&sizes)
    .bind(&positions)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

//! Server cart repository (`cart_items`).
//!
//! Lines are keyed by `(user_id, product_id, size)`. Writes carry the line's
//! final quantity, so replaying the same upsert is harmless.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use urban_style_core::cart::{CartLine, LineKey, ProductSnapshot};
use urban_style_core::{CategoryId, Price, ProductId, UserId};

use super::{RepositoryError, non_negative, to_db_int};

/// Internal row type: a cart line joined with its live product data.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: Uuid,
    size: String,
    quantity: i32,
    name: String,
    slug: String,
    price: Decimal,
    image: Option<String>,
    category_id: Uuid,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.product_id))
        })?;

        Ok(Self {
            product: ProductSnapshot {
                id: ProductId::new(row.product_id),
                name: row.name,
                slug: row.slug,
                price,
                image: row.image,
                category_id: CategoryId::new(row.category_id),
            },
            size: row.size,
            quantity: non_negative(row.quantity, "quantity")?,
        })
    }
}

/// Repository for server cart lines.
pub struct CartItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartItemRepository<'a> {
    /// Create a new cart item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cart lines with current product data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.product_id, ci.size, ci.quantity,
                   p.name, p.slug, p.price, p.images[1] AS image, p.category_id
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Insert a line or overwrite its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails (including a
    /// product that was deleted in the meantime).
    pub async fn upsert(&self, user_id: UserId, line: &CartLine) -> Result<(), RepositoryError> {
        upsert_line(self.pool, user_id, line).await
    }

    /// Upsert several lines in one transaction: either all are written or
    /// none are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails.
    pub async fn upsert_all(
        &self,
        user_id: UserId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for line in lines {
            upsert_line(&mut *tx, user_id, line).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Delete one line. Deleting a missing line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, key: &LineKey) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 AND size = $3")
            .bind(user_id)
            .bind(key.product_id)
            .bind(&key.size)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete every line of a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

async fn upsert_line<'e, E>(executor: E, user_id: UserId, line: &CartLine) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO cart_items (user_id, product_id, size, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT ON CONSTRAINT cart_items_line_key
        DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
        ",
    )
    .bind(user_id)
    .bind(line.product.id)
    .bind(&line.size)
    .bind(to_db_int(line.quantity, "quantity")?)
    .execute(executor)
    .await?;

    Ok(())
}

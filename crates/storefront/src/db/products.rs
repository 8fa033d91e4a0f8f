//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use urban_style_core::catalog::{Product, ProductDraft};
use urban_style_core::{CategoryId, Price, ProductId};

use super::{RepositoryError, non_negative, to_db_int};

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, stock, category_id, \
                               images, sizes, featured, created_at";

const SLUG_TAKEN: &str = "a product with this slug already exists";

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: Uuid,
    images: Vec<String>,
    sizes: Vec<String>,
    featured: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price)
            .map_err(|e| RepositoryError::DataCorruption(format!("product {}: {e}", row.id)))?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            price,
            stock: non_negative(row.stock, "stock")?,
            category_id: CategoryId::new(row.category_id),
            images: row.images,
            sizes: row.sizes,
            featured: row.featured,
            created_at: row.created_at,
        })
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products
                (name, slug, description, price, stock, category_id, images, sizes, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(to_db_int(draft.stock, "stock")?)
        .bind(draft.category_id)
        .bind(&draft.images)
        .bind(&draft.sizes)
        .bind(draft.featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, SLUG_TAKEN))?;

        Product::try_from(row)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist,
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products SET
                name = $2, slug = $3, description = $4, price = $5, stock = $6,
                category_id = $7, images = $8, sizes = $9, featured = $10,
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(to_db_int(draft.stock, "stock")?)
        .bind(draft.category_id)
        .bind(&draft.images)
        .bind(&draft.sizes)
        .bind(draft.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, SLUG_TAKEN))?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Delete a product.
    ///
    /// Cart lines referencing it go with it; order items keep their copied
    /// name and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Category repository.

use sqlx::PgPool;
use uuid::Uuid;

use urban_style_core::CategoryId;
use urban_style_core::catalog::{Category, CategoryDraft};

use super::RepositoryError;

const SLUG_TAKEN: &str = "a category with this slug already exists";

/// Internal row type for category queries.
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Find a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, draft: &CategoryDraft) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description
            ",
        )
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, SLUG_TAKEN))?;

        Ok(row.into())
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist,
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories SET name = $2, slug = $3, description = $4
            WHERE id = $1
            RETURNING id, name, slug, description
            ",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, SLUG_TAKEN))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist,
    /// `RepositoryError::Conflict` while products still reference it.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict(
                        "category still has products".to_owned(),
                    );
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

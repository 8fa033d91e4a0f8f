//! Cached catalog reads.
//!
//! The whole catalog (products and categories) is small enough to hold in
//! memory, so browsing, search and pagination run over a cached snapshot
//! loaded from `PostgreSQL`. Admin writes call [`CatalogCache::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use urban_style_core::ProductId;
use urban_style_core::catalog::{Category, Product};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};

/// Cache key for catalog snapshots.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
}

/// Read-through cache in front of the product and category tables.
#[derive(Clone)]
pub struct CatalogCache {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(8).time_to_live(ttl).build();

        Self { pool, cache }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(&self.pool).list().await?);
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Every category, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the categories cannot be loaded.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CategoryRepository::new(&self.pool).list().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;

        Ok(categories)
    }

    /// Look up one product by ID in the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products().await?.iter().find(|p| p.id == id).cloned())
    }

    /// Drop every cached snapshot.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Hoodies
//!     description: Heavyweight fleece
//! products:
//!   - name: Shadow Box Hoodie
//!     category: hoodies        # category slug
//!     price: 459000
//!     stock: 40
//!     sizes: [S, M, L, XL]
//!     images: [https://cdn.urbanstyle.id/hoodie-black.jpg]
//!     featured: true
//! ```
//!
//! Entries whose slug already exists are skipped, so the file can be
//! applied repeatedly.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use urban_style_core::catalog::{
    CatalogValidationError, Category, CategoryInput, ProductInput,
};
use urban_style_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};

use super::{ConnectError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid entry {0}: {1}")]
    Invalid(String, CatalogValidationError),

    #[error("Product {product} references unknown category {category}")]
    UnknownCategory { product: String, category: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Catalog file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub categories: Vec<CategoryInput>,
    pub products: Vec<SeedProduct>,
}

/// A product entry; `category` is the slug of its category.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl SeedProduct {
    /// Resolve the category slug and build the admin product form.
    fn to_input(&self, categories: &[Category]) -> Result<ProductInput, SeedError> {
        let category = categories
            .iter()
            .find(|c| c.slug == self.category)
            .ok_or_else(|| SeedError::UnknownCategory {
                product: self.name.clone(),
                category: self.category.clone(),
            })?;

        Ok(ProductInput {
            name: Some(self.name.clone()),
            slug: self.slug.clone(),
            description: Some(self.description.clone()),
            price: Some(self.price),
            stock: Some(self.stock),
            category_id: Some(category.id),
            images: self.images.clone(),
            sizes: self.sizes.clone(),
            featured: self.featured,
        })
    }
}

/// Counts reported after seeding.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub products_created: usize,
    pub skipped: usize,
}

/// Parse and validate the whole file before touching the database.
fn parse(content: &str) -> Result<CatalogFile, SeedError> {
    let file: CatalogFile = serde_yaml::from_str(content)?;
    for input in &file.categories {
        input
            .validate()
            .map_err(|e| SeedError::Invalid(input.name.clone().unwrap_or_default(), e))?;
    }
    Ok(file)
}

/// Seed categories, then products, from `file_path`.
pub async fn catalog(file_path: &str) -> Result<SeedSummary, SeedError> {
    let path = Path::new(file_path);
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SeedError::Read(file_path.to_owned(), e))?;
    let file = parse(&content)?;
    info!(
        categories = file.categories.len(),
        products = file.products.len(),
        "Parsed catalog file"
    );

    let pool = connect().await?;
    let category_repo = CategoryRepository::new(&pool);
    let product_repo = ProductRepository::new(&pool);
    let mut summary = SeedSummary::default();

    for input in &file.categories {
        let draft = input
            .validate()
            .map_err(|e| SeedError::Invalid(input.name.clone().unwrap_or_default(), e))?;
        match category_repo.create(&draft).await {
            Ok(category) => {
                info!(slug = %category.slug, "Category created");
                summary.categories_created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                warn!(slug = %draft.slug, "Category exists, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let categories = category_repo.list().await?;
    for entry in &file.products {
        let draft = entry
            .to_input(&categories)?
            .validate()
            .map_err(|e| SeedError::Invalid(entry.name.clone(), e))?;
        match product_repo.create(&draft).await {
            Ok(product) => {
                info!(slug = %product.slug, "Product created");
                summary.products_created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                warn!(slug = %draft.slug, "Product exists, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use urban_style_core::CategoryId;

    use super::*;

    const CATALOG: &str = r"
categories:
  - name: Hoodies
  - name: Graphic Tees
    slug: tees
products:
  - name: Shadow Box Hoodie
    category: hoodies
    price: 459000
    stock: 40
    sizes: [S, M, '', L]
  - name: Static Tee
    category: tees
    price: '189000.50'
    stock: 12
";

    fn category(slug: &str) -> Category {
        Category {
            id: CategoryId::generate(),
            name: slug.to_owned(),
            slug: slug.to_owned(),
            description: String::new(),
        }
    }

    #[test]
    fn test_parse_catalog() {
        let file = parse(CATALOG).unwrap();
        assert_eq!(file.categories.len(), 2);
        assert_eq!(file.products.len(), 2);
        assert_eq!(file.categories[0].validate().unwrap().slug, "hoodies");
        assert_eq!(file.categories[1].validate().unwrap().slug, "tees");
    }

    #[test]
    fn test_parse_rejects_blank_category_name() {
        let result = parse("categories:\n  - name: '  '\n");
        assert!(matches!(result, Err(SeedError::Invalid(_, _))));
    }

    #[test]
    fn test_product_resolves_category_slug() {
        let file = parse(CATALOG).unwrap();
        let categories = vec![category("hoodies"), category("tees")];

        let draft = file.products[0]
            .to_input(&categories)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(draft.category_id, categories[0].id);
        assert_eq!(draft.slug, "shadow-box-hoodie");
        assert_eq!(draft.sizes, vec!["S", "M", "L"]);
    }

    #[test]
    fn test_product_with_unknown_category() {
        let file = parse(CATALOG).unwrap();
        let result = file.products[1].to_input(&[category("hoodies")]);
        assert!(matches!(result, Err(SeedError::UnknownCategory { .. })));
    }
}

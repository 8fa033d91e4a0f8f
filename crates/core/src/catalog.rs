//! Catalog models and in-memory browse logic.
//!
//! The catalog is small enough that the storefront fetches every product once
//! (and caches it), then filters and paginates here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Price, ProductId, is_valid_slug, slugify};

/// Products shown per catalog page.
pub const CATALOG_PAGE_SIZE: usize = 12;

/// Maximum number of featured products on the home page.
pub const FEATURED_LIMIT: usize = 4;

/// Number of newest products shown as "new arrivals".
pub const NEW_ARRIVALS_LIMIT: usize = 4;

/// Number of related products shown on a product page.
pub const RELATED_LIMIT: usize = 4;

/// Products with fewer units than this count as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 20;

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Price,
    pub stock: u32,
    pub category_id: CategoryId,
    /// Image URLs, first one is the primary image.
    pub images: Vec<String>,
    /// Available sizes (e.g. `S`, `M`, `L`). Empty means one-size.
    pub sizes: Vec<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Primary image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether `size` can be ordered for this product.
    ///
    /// Products that declare no sizes accept any size label (including the
    /// empty string).
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.is_empty() || self.sizes.iter().any(|s| s == size)
    }

    /// Default size preselected on the product page.
    #[must_use]
    pub fn default_size(&self) -> &str {
        self.sizes.first().map_or("", String::as_str)
    }

    /// Whether stock is below [`LOW_STOCK_THRESHOLD`].
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

// =============================================================================
// Browse
// =============================================================================

/// Customer catalog query (`/api/products?search=&category=&page=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    /// Free-text search over name and description.
    pub search: Option<String>,
    /// Category slug, or `all`.
    pub category: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually returned (after clamping).
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T: Clone> Page<T> {
    /// Slice `items` into the requested page.
    ///
    /// Pages are clamped into `1..=total_pages`, so asking for page 0 or a
    /// page past the end returns the first or last page instead of nothing.
    #[must_use]
    pub fn paginate(items: &[T], requested: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page);
        let page = requested.clamp(1, total_pages.max(1));
        let start = (page - 1) * per_page;

        let items = items
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();

        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}

/// Normalize an optional search string: trimmed, lowercased, `None` if blank.
fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Filter and paginate the catalog for a customer query.
///
/// `products` are expected in display order (newest first). An unknown
/// category slug matches no products.
#[must_use]
pub fn browse(products: &[Product], categories: &[Category], query: &CatalogQuery) -> Page<Product> {
    let needle = normalize_search(query.search.as_deref());

    let category_filter = match query.category.as_deref().map(str::trim) {
        None | Some("" | ALL_CATEGORIES) => None,
        Some(slug) => Some(categories.iter().find(|c| c.slug == slug).map(|c| c.id)),
    };

    let filtered: Vec<Product> = products
        .iter()
        .filter(|p| needle.as_deref().is_none_or(|n| p.matches_search(n)))
        .filter(|p| match category_filter {
            None => true,
            Some(Some(id)) => p.category_id == id,
            Some(None) => false,
        })
        .cloned()
        .collect();

    Page::paginate(&filtered, query.page.unwrap_or(1), CATALOG_PAGE_SIZE)
}

/// Featured products for the home page.
#[must_use]
pub fn featured(products: &[Product]) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.featured)
        .take(FEATURED_LIMIT)
        .cloned()
        .collect()
}

/// Newest products, regardless of input order.
#[must_use]
pub fn new_arrivals(products: &[Product]) -> Vec<Product> {
    let mut newest: Vec<&Product> = products.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    newest
        .into_iter()
        .take(NEW_ARRIVALS_LIMIT)
        .cloned()
        .collect()
}

/// Other products from the same category as `product`.
#[must_use]
pub fn related(products: &[Product], product: &Product) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.category_id == product.category_id && p.id != product.id)
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

/// Back-office product list filter (`/api/admin/products?search=&category=`).
///
/// Unlike the customer catalog, search only looks at the name and the
/// category is given by id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminProductFilter {
    pub search: Option<String>,
    /// Category id, or `all`.
    pub category: Option<String>,
}

impl AdminProductFilter {
    /// Apply the filter, preserving input order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let needle = normalize_search(self.search.as_deref());
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);

        products
            .iter()
            .filter(|p| {
                needle
                    .as_deref()
                    .is_none_or(|n| p.name.to_lowercase().contains(n))
            })
            .filter(|p| category.is_none_or(|c| p.category_id.to_string() == c))
            .cloned()
            .collect()
    }
}

// =============================================================================
// Back-office input validation
// =============================================================================

/// Why a category or product form was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    /// A required field was missing or blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The slug (given or derived) is not `[a-z0-9-]+`.
    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),
    /// Price below zero.
    #[error("price cannot be negative")]
    NegativePrice,
    /// Stock below zero or beyond range.
    #[error("stock must be between 0 and {max}", max = i32::MAX)]
    InvalidStock,
}

/// Resolve the slug: explicit value if given, otherwise derived from the name.
fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, CatalogValidationError> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_owned(),
        None => slugify(name),
    };
    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(CatalogValidationError::InvalidSlug(slug))
    }
}

/// Drop blank entries and trim the rest.
fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CatalogValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(CatalogValidationError::Missing(field))
}

/// Category create/update form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// A validated category ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl CategoryInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is blank or the slug is not canonical.
    pub fn validate(&self) -> Result<CategoryDraft, CatalogValidationError> {
        let name = required(self.name.as_deref(), "name")?;
        let slug = resolve_slug(self.slug.as_deref(), name)?;
        Ok(CategoryDraft {
            name: name.to_owned(),
            slug,
            description: self.description.as_deref().unwrap_or("").trim().to_owned(),
        })
    }
}

/// Product create/update form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Price,
    pub stock: u32,
    pub category_id: CategoryId,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub featured: bool,
}

impl ProductInput {
    /// Validate the form.
    ///
    /// Name, category, price and stock are required.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<ProductDraft, CatalogValidationError> {
        let name = required(self.name.as_deref(), "name")?;
        let category_id = self
            .category_id
            .ok_or(CatalogValidationError::Missing("category_id"))?;
        let price = self.price.ok_or(CatalogValidationError::Missing("price"))?;
        let price = Price::new(price).map_err(|_| CatalogValidationError::NegativePrice)?;
        let stock = self.stock.ok_or(CatalogValidationError::Missing("stock"))?;
        let stock = u32::try_from(stock)
            .ok()
            .filter(|s| i32::try_from(*s).is_ok())
            .ok_or(CatalogValidationError::InvalidStock)?;
        let slug = resolve_slug(self.slug.as_deref(), name)?;

        Ok(ProductDraft {
            name: name.to_owned(),
            slug,
            description: self.description.as_deref().unwrap_or("").trim().to_owned(),
            price,
            stock,
            category_id,
            images: clean_list(&self.images),
            sizes: clean_list(&self.sizes),
            featured: self.featured,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    pub(crate) fn category(slug: &str) -> Category {
        Category {
            id: CategoryId::generate(),
            name: slug.to_uppercase(),
            slug: slug.to_owned(),
            description: String::new(),
        }
    }

    pub(crate) fn product(name: &str, category: &Category, price: u64) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_owned(),
            slug: slugify(name),
            description: format!("{name} description"),
            price: Price::from_rupiah(price),
            stock: 50,
            category_id: category.id,
            images: vec![format!("https://cdn.example.com/{}.jpg", slugify(name))],
            sizes: vec!["S".into(), "M".into(), "L".into()],
            featured: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn many(n: usize, cat: &Category) -> Vec<Product> {
        (0..n).map(|i| product(&format!("Tee {i}"), cat, 100_000)).collect()
    }

    #[test]
    fn test_paginate_clamps_pages() {
        let items: Vec<u32> = (1..=25).collect();
        let page = Page::paginate(&items, 3, 12);
        assert_eq!(page.items, vec![25]);
        assert_eq!(page.total_pages, 3);

        let page = Page::paginate(&items, 0, 12);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 12);

        let page = Page::paginate(&items, 99, 12);
        assert_eq!(page.page, 3);
    }

    #[test]
    fn test_paginate_empty() {
        let items: Vec<u32> = Vec::new();
        let page = Page::paginate(&items, 2, 12);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_browse_search_matches_name_or_description() {
        let tops = category("tops");
        let mut hoodie = product("Hoodie Black", &tops, 350_000);
        hoodie.description = "Heavyweight fleece".into();
        let tee = product("Basic Tee", &tops, 120_000);
        let products = vec![hoodie, tee];

        let query = CatalogQuery {
            search: Some("FLEECE".into()),
            ..CatalogQuery::default()
        };
        let page = browse(&products, std::slice::from_ref(&tops), &query);
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Hoodie Black");
    }

    #[test]
    fn test_browse_category_filter() {
        let tops = category("tops");
        let bottoms = category("bottoms");
        let products = vec![
            product("Tee", &tops, 100_000),
            product("Cargo", &bottoms, 300_000),
        ];
        let categories = vec![tops, bottoms];

        let query = CatalogQuery {
            category: Some("bottoms".into()),
            ..CatalogQuery::default()
        };
        let page = browse(&products, &categories, &query);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Cargo");

        let query = CatalogQuery {
            category: Some("all".into()),
            ..CatalogQuery::default()
        };
        assert_eq!(browse(&products, &categories, &query).total_items, 2);

        let query = CatalogQuery {
            category: Some("unknown".into()),
            ..CatalogQuery::default()
        };
        assert_eq!(browse(&products, &categories, &query).total_items, 0);
    }

    #[test]
    fn test_browse_paginates_twelve_per_page() {
        let tops = category("tops");
        let products = many(30, &tops);
        let query = CatalogQuery {
            page: Some(3),
            ..CatalogQuery::default()
        };
        let page = browse(&products, &[tops], &query);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 6);
        assert_eq!(page.items[0].name, "Tee 24");
    }

    #[test]
    fn test_featured_limit() {
        let tops = category("tops");
        let mut products = many(6, &tops);
        for p in &mut products {
            p.featured = true;
        }
        products[0].featured = false;
        let result = featured(&products);
        assert_eq!(result.len(), 4);
        assert_eq!(result[0].name, "Tee 1");
    }

    #[test]
    fn test_new_arrivals_sorted_newest_first() {
        let tops = category("tops");
        let mut products = many(6, &tops);
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for (i, p) in products.iter_mut().enumerate() {
            p.created_at = base + Duration::days(i64::try_from(i).unwrap());
        }
        let result = new_arrivals(&products);
        let names: Vec<_> = result.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Tee 5", "Tee 4", "Tee 3", "Tee 2"]);
    }

    #[test]
    fn test_admin_filter_name_only() {
        let tops = category("tops");
        let mut tee = product("Basic Tee", &tops, 100_000);
        tee.description = "hoodie-like".into();
        let hoodie = product("Hoodie", &tops, 100_000);
        let products = vec![tee, hoodie];

        let filter = AdminProductFilter {
            search: Some("hoodie".into()),
            category: Some(tops.id.to_string()),
        };
        let result = filter.apply(&products);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Hoodie");

        let filter = AdminProductFilter {
            search: None,
            category: Some(CategoryId::generate().to_string()),
        };
        assert!(filter.apply(&products).is_empty());
    }

    #[test]
    fn test_offers_size() {
        let tops = category("tops");
        let mut tee = product("Tee", &tops, 1);
        assert!(tee.offers_size("M"));
        assert!(!tee.offers_size("XXL"));
        assert_eq!(tee.default_size(), "S");
        tee.sizes.clear();
        assert!(tee.offers_size(""));
        assert_eq!(tee.default_size(), "");
    }

    #[test]
    fn test_category_input_derives_slug() {
        let input = CategoryInput {
            name: Some("  Outer Wear ".into()),
            slug: None,
            description: None,
        };
        let draft = input.validate().unwrap();
        assert_eq!(draft.name, "Outer Wear");
        assert_eq!(draft.slug, "outer-wear");
        assert_eq!(draft.description, "");
    }

    #[test]
    fn test_category_input_requires_name() {
        let input = CategoryInput::default();
        assert_eq!(
            input.validate(),
            Err(CatalogValidationError::Missing("name"))
        );
    }

    #[test]
    fn test_product_input_validation() {
        let category_id = CategoryId::generate();
        let mut input = ProductInput {
            name: Some("Oversized Tee".into()),
            slug: None,
            description: Some("Cotton 24s".into()),
            price: Some(Decimal::from(150_000)),
            stock: Some(40),
            category_id: Some(category_id),
            images: vec![" https://cdn/a.jpg ".into(), "  ".into()],
            sizes: vec!["S".into(), "".into(), "M".into()],
            featured: true,
        };
        let draft = input.validate().unwrap();
        assert_eq!(draft.slug, "oversized-tee");
        assert_eq!(draft.images, vec!["https://cdn/a.jpg"]);
        assert_eq!(draft.sizes, vec!["S", "M"]);
        assert_eq!(draft.stock, 40);

        input.stock = Some(-1);
        assert_eq!(input.validate(), Err(CatalogValidationError::InvalidStock));

        input.stock = Some(1);
        input.price = Some(Decimal::from(-5));
        assert_eq!(input.validate(), Err(CatalogValidationError::NegativePrice));

        input.price = None;
        assert_eq!(
            input.validate(),
            Err(CatalogValidationError::Missing("price"))
        );

        input.price = Some(Decimal::from(1));
        input.slug = Some("Bad Slug".into());
        assert!(matches!(
            input.validate(),
            Err(CatalogValidationError::InvalidSlug(_))
        ));
    }

    #[test]
    fn test_related_excludes_self_and_other_categories() {
        let tops = category("tops");
        let pants = category("pants");
        let mut products = many(6, &tops);
        products.push(product("Cargo", &pants, 300_000));

        let first = products[0].clone();
        let related = related(&products, &first);
        assert_eq!(related.len(), RELATED_LIMIT);
        assert!(related.iter().all(|p| p.id != first.id));
        assert!(related.iter().all(|p| p.category_id == tops.id));
    }
}

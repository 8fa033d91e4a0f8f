//! Catalog route handlers.
//!
//! All reads go through the catalog cache; filtering and pagination run over
//! the cached snapshot.

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use urban_style_core::catalog::{
    self, CatalogQuery, Category, Page, Product,
};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

/// Product page payload.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Option<Category>,
    pub related: Vec<Product>,
    pub default_size: String,
    pub price_display: String,
    pub low_stock: bool,
}

/// `GET /api/products?search=&category=&page=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Page<Product>>> {
    let products = state.catalog().products().await?;
    let categories = state.catalog().categories().await?;

    Ok(Json(catalog::browse(&products, &categories, &query)))
}

/// `GET /api/products/featured`
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().products().await?;
    Ok(Json(catalog::featured(&products)))
}

/// `GET /api/products/new-arrivals`
pub async fn new_arrivals(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().products().await?;
    Ok(Json(catalog::new_arrivals(&products)))
}

/// `GET /api/products/{slug}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let products = state.catalog().products().await?;
    let product = products
        .iter()
        .find(|p| p.slug == slug)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let categories = state.catalog().categories().await?;
    let category = categories
        .iter()
        .find(|c| c.id == product.category_id)
        .cloned();

    Ok(Json(ProductDetail {
        related: catalog::related(&products, &product),
        default_size: product.default_size().to_owned(),
        price_display: product.price.display(),
        low_stock: product.is_low_stock(),
        category,
        product,
    }))
}

/// `GET /api/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.catalog().categories().await?;
    Ok(Json(categories.as_ref().clone()))
}

//! Back-office product management.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use urban_style_core::ProductId;
use urban_style_core::catalog::{AdminProductFilter, Product, ProductDraft, ProductInput};

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Reject drafts that point at a category that does not exist.
async fn ensure_category(state: &AppState, draft: &ProductDraft) -> Result<()> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    if categories.iter().any(|c| c.id == draft.category_id) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Category not found".to_string()))
    }
}

/// `GET /api/admin/products?search=&category=`
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<AdminProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(filter.apply(&products)))
}

/// `POST /api/admin/products`
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let draft = input.validate()?;
    ensure_category(&state, &draft).await?;

    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    state.catalog().invalidate().await;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let draft = input.validate()?;
    ensure_category(&state, &draft).await?;

    let product = ProductRepository::new(state.pool())
        .update(id, &draft)
        .await?;
    state.catalog().invalidate().await;

    tracing::info!("Product updated");
    Ok(Json(product))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate().await;

    tracing::info!("Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

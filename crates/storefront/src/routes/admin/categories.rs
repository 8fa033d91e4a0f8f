//! Back-office category management.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::instrument;

use urban_style_core::CategoryId;
use urban_style_core::catalog::{Category, CategoryInput};

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// A category with the number of products filed under it.
#[derive(Debug, Serialize)]
pub struct CategoryListItem {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

/// `GET /api/admin/categories`
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<CategoryListItem>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let products = ProductRepository::new(state.pool()).list().await?;

    let items = categories
        .into_iter()
        .map(|category| CategoryListItem {
            product_count: products
                .iter()
                .filter(|p| p.category_id == category.id)
                .count(),
            category,
        })
        .collect();

    Ok(Json(items))
}

/// `POST /api/admin/categories`
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse> {
    let draft = input.validate()?;
    let category = CategoryRepository::new(state.pool()).create(&draft).await?;
    state.catalog().invalidate().await;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/admin/categories/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, category_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let draft = input.validate()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &draft)
        .await?;
    state.catalog().invalidate().await;

    tracing::info!("Category updated");
    Ok(Json(category))
}

/// `DELETE /api/admin/categories/{id}`
///
/// Refused with 409 while products still belong to the category.
#[instrument(skip_all, fields(admin_id = %admin.id, category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate().await;

    tracing::info!("Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

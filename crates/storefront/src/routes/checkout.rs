//! Checkout and order history route handlers (signed-in users only).

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use urban_style_core::OrderNumber;
use urban_style_core::checkout::CheckoutForm;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::checkout::{CheckoutService, CheckoutSummary};
use crate::state::AppState;

/// `GET /api/checkout`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutSummary>> {
    let summary = CheckoutService::new(state.pool()).summary(&user).await?;
    Ok(Json(summary))
}

/// `POST /api/checkout`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CheckoutForm>,
) -> Result<impl IntoResponse> {
    let order = CheckoutService::new(state.pool())
        .place_order(&user, &form)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(user.id)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
///
/// Another customer's order answers 404, same as a missing one.
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let not_found = || AppError::NotFound("Order not found".to_string());
    let id = OrderNumber::parse(&id).map_err(|_| not_found())?;

    let order = OrderRepository::new(state.pool())
        .get(&id)
        .await?
        .filter(|o| o.customer_id == Some(user.id))
        .ok_or_else(not_found)?;
    Ok(Json(order))
}

//! Back-office order management.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use urban_style_core::{OrderNumber, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// `GET /api/admin/orders` query.
#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    /// A status, or `all`.
    pub status: Option<String>,
}

impl OrderFilter {
    fn status(&self) -> Result<Option<OrderStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => raw
                .parse::<OrderStatus>()
                .map(Some)
                .map_err(|e| AppError::BadRequest(e.to_string())),
        }
    }
}

/// `PATCH /api/admin/orders/{id}/status` body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

fn parse_order_id(raw: &str) -> Result<OrderNumber> {
    OrderNumber::parse(raw).map_err(|_| AppError::NotFound("Order not found".to_string()))
}

/// `GET /api/admin/orders?status=`
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list(filter.status()?)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/admin/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = parse_order_id(&id)?;
    let order = OrderRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

/// `PATCH /api/admin/orders/{id}/status`
///
/// Any status may follow any other.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let id = parse_order_id(&id)?;
    let order = OrderRepository::new(state.pool())
        .update_status(&id, body.status)
        .await?;

    tracing::info!(status = body.status.as_str(), "Order status updated");
    Ok(Json(order))
}

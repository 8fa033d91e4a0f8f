//! Back-office routes. Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod categories;
pub mod orders;
pub mod products;
pub mod reports;

use axum::{
    Router,
    routing::{get, patch, put},
};

use crate::state::AppState;

/// Create the `/api/admin` router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(reports::dashboard))
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/reports", get(reports::report))
        .route("/reports/export.csv", get(reports::export_csv))
}

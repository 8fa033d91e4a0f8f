//! Cart route handlers.
//!
//! The same endpoints serve guests (cart in the session) and signed-in users
//! (cart in `cart_items`); [`ActiveCartStore`] picks the right one per request.
//! Every handler answers with the full cart summary.

use axum::extract::State;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use urban_style_core::ProductId;
use urban_style_core::cart::{CartSummary, MAX_LINE_QUANTITY};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::OptionalAuth;
use crate::services::cart::{ActiveCartStore, CartError, CartService};
use crate::state::AppState;

/// `POST /api/cart/items` body.
#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    /// Defaults to the product's first size.
    #[serde(default)]
    pub size: Option<String>,
}

/// `PATCH /api/cart/items` body.
#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: String,
    /// Values below 1 leave the cart unchanged; values above
    /// [`MAX_LINE_QUANTITY`] are rejected.
    pub quantity: i64,
}

/// `DELETE /api/cart/items` body.
#[derive(Debug, Deserialize)]
pub struct RemoveItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: String,
}

fn cart_service(
    state: &AppState,
    session: Session,
    auth: &OptionalAuth,
) -> CartService<ActiveCartStore> {
    CartService::new(ActiveCartStore::for_request(
        session,
        auth.0.as_ref(),
        state.pool(),
        state.catalog(),
    ))
}

/// `GET /api/cart`
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Json<CartSummary>> {
    let cart = cart_service(&state, session, &auth).cart().await?;
    Ok(Json(cart.summary()))
}

/// `POST /api/cart/items`
#[instrument(skip(state, session, auth))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(body): Json<AddItem>,
) -> Result<Json<CartSummary>> {
    let product = state
        .catalog()
        .product(body.product_id)
        .await?
        .ok_or(CartError::UnknownProduct)?;
    let size = body
        .size
        .unwrap_or_else(|| product.default_size().to_owned());

    let cart = cart_service(&state, session, &auth)
        .add(&product, &size)
        .await?;
    Ok(Json(cart.summary()))
}

/// `PATCH /api/cart/items`
#[instrument(skip(state, session, auth))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(body): Json<UpdateItem>,
) -> Result<Json<CartSummary>> {
    let quantity = u32::try_from(body.quantity.max(0))
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or(CartError::QuantityTooLarge)?;

    let cart = cart_service(&state, session, &auth)
        .update_quantity(body.product_id, &body.size, quantity)
        .await?;
    Ok(Json(cart.summary()))
}

/// `DELETE /api/cart/items`
#[instrument(skip(state, session, auth))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Json(body): Json<RemoveItem>,
) -> Result<Json<CartSummary>> {
    let cart = cart_service(&state, session, &auth)
        .remove(body.product_id, &body.size)
        .await?;
    Ok(Json(cart.summary()))
}

/// `DELETE /api/cart`
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Json<CartSummary>> {
    let cart = cart_service(&state, session, &auth).clear().await?;
    Ok(Json(cart.summary()))
}

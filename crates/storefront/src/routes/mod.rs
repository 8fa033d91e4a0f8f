//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited)
//! POST   /api/auth/register          - Create an account and sign in
//! POST   /api/auth/login             - Sign in, merging the guest cart
//! POST   /api/auth/logout            - Sign out
//! GET    /api/auth/me                - Current user
//!
//! # Catalog
//! GET    /api/products               - Browse (search, category, page)
//! GET    /api/products/featured      - Featured products
//! GET    /api/products/new-arrivals  - Newest products
//! GET    /api/products/{slug}        - Product detail
//! GET    /api/categories             - Category list
//!
//! # Cart (guest session or server cart, rate limited)
//! GET    /api/cart                   - Cart with totals
//! DELETE /api/cart                   - Clear
//! POST   /api/cart/items             - Add one unit
//! PATCH  /api/cart/items             - Set quantity
//! DELETE /api/cart/items             - Remove a line
//!
//! # Checkout (requires auth, rate limited)
//! GET    /api/checkout               - Prefilled form and totals
//! POST   /api/checkout               - Place the order
//! GET    /api/orders                 - Order history
//! GET    /api/orders/{id}            - One of the caller's orders
//!
//! # Back office (requires admin)
//! /api/admin/...                     - See [`admin::routes`]
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/featured", get(products::featured))
        .route("/new-arrivals", get(products::new_arrivals))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route(
            "/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
}

/// Create the checkout and order history router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .route("/orders", get(checkout::orders))
        .route("/orders/{id}", get(checkout::order))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
        .merge(checkout_routes().layer(api_rate_limiter()))
        .nest("/admin", admin::routes())
}

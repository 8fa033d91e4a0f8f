//! Cart service: one interface over guest and server carts.
//!
//! Guests keep their cart in the session; signed-in users keep it in the
//! `cart_items` table. Both sit behind [`CartStore`]. [`CartService`] applies
//! each operation to the in-memory [`Cart`] first and then writes exactly the
//! resulting [`CartChange`] through the store. A failed write is returned to
//! the caller; the next request reloads whatever the store actually holds.

use std::future::Future;

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use urban_style_core::cart::{self, Cart, CartChange, CartLine, LineKey, ProductSnapshot};
use urban_style_core::catalog::Product;
use urban_style_core::{ProductId, UserId};

use super::catalog::CatalogCache;
use crate::db::{CartItemRepository, RepositoryError};
use crate::models::{CurrentUser, session_keys};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist.
    #[error("product not found")]
    UnknownProduct,

    /// The product is not sold in this size.
    #[error("size {0:?} is not available for this product")]
    InvalidSize(String),

    /// The requested quantity is above the per-line limit.
    #[error("quantity cannot exceed {}", cart::MAX_LINE_QUANTITY)]
    QuantityTooLarge,

    /// Reading or writing the session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Where a cart lives.
///
/// Writes carry a line's final state, never a delta.
pub trait CartStore {
    /// Load the current cart.
    fn load(&self) -> impl Future<Output = Result<Cart, CartError>> + Send;

    /// Insert a line or replace the stored line with the same key.
    fn upsert(&self, line: &CartLine) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Upsert several lines as one write: either all are stored or none are.
    fn upsert_all(&self, lines: &[CartLine]) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Remove one line. Removing a missing line is not an error.
    fn delete(&self, key: &LineKey) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Remove every line.
    fn clear(&self) -> impl Future<Output = Result<(), CartError>> + Send;
}

// =============================================================================
// Guest cart (session)
// =============================================================================

/// Guest cart held in the session under [`session_keys::GUEST_CART`].
#[derive(Clone)]
pub struct SessionCartStore {
    session: Session,
    catalog: CatalogCache,
}

impl SessionCartStore {
    /// Create a store over `session`.
    #[must_use]
    pub const fn new(session: Session, catalog: CatalogCache) -> Self {
        Self { session, catalog }
    }

    async fn stored(&self) -> Result<Cart, CartError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        if cart.is_empty() {
            self.session.remove::<Cart>(session_keys::GUEST_CART).await?;
        } else {
            self.session.insert(session_keys::GUEST_CART, cart).await?;
        }
        Ok(())
    }
}

impl CartStore for SessionCartStore {
    /// Load the guest cart with product data refreshed from the catalog.
    ///
    /// Lines whose product has been deleted are dropped and the pruned cart
    /// is written back. An empty cart never touches the catalog.
    async fn load(&self) -> Result<Cart, CartError> {
        let mut cart = self.stored().await?;
        if cart.is_empty() {
            return Ok(cart);
        }

        let products = self.catalog.products().await?;
        let dropped = cart.refresh(|id| products.iter().find(|p| p.id == id));
        if !dropped.is_empty() {
            tracing::debug!(dropped = dropped.len(), "Dropped deleted products from guest cart");
            self.save(&cart).await?;
        }

        Ok(cart)
    }

    async fn upsert(&self, line: &CartLine) -> Result<(), CartError> {
        let mut lines = self.stored().await?.into_lines();
        match lines.iter_mut().find(|l| l.key() == line.key()) {
            Some(existing) => existing.clone_from(line),
            None => lines.push(line.clone()),
        }
        self.save(&Cart::from_lines(lines)).await
    }

    async fn upsert_all(&self, lines: &[CartLine]) -> Result<(), CartError> {
        let mut stored = self.stored().await?.into_lines();
        for line in lines {
            match stored.iter_mut().find(|l| l.key() == line.key()) {
                Some(existing) => existing.clone_from(line),
                None => stored.push(line.clone()),
            }
        }
        self.save(&Cart::from_lines(stored)).await
    }

    async fn delete(&self, key: &LineKey) -> Result<(), CartError> {
        let mut cart = self.stored().await?;
        cart.remove(key.product_id, &key.size);
        self.save(&cart).await
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.session.remove::<Cart>(session_keys::GUEST_CART).await?;
        Ok(())
    }
}

// =============================================================================
// Server cart (cart_items)
// =============================================================================

/// A signed-in user's cart in the `cart_items` table.
#[derive(Clone)]
pub struct DbCartStore {
    pool: PgPool,
    user_id: UserId,
}

impl DbCartStore {
    /// Create a store for `user_id`.
    #[must_use]
    pub const fn new(pool: PgPool, user_id: UserId) -> Self {
        Self { pool, user_id }
    }
}

impl CartStore for DbCartStore {
    async fn load(&self) -> Result<Cart, CartError> {
        let lines = CartItemRepository::new(&self.pool).list(self.user_id).await?;
        Ok(Cart::from_lines(lines))
    }

    async fn upsert(&self, line: &CartLine) -> Result<(), CartError> {
        CartItemRepository::new(&self.pool)
            .upsert(self.user_id, line)
            .await?;
        Ok(())
    }

    async fn upsert_all(&self, lines: &[CartLine]) -> Result<(), CartError> {
        CartItemRepository::new(&self.pool)
            .upsert_all(self.user_id, lines)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &LineKey) -> Result<(), CartError> {
        CartItemRepository::new(&self.pool)
            .delete(self.user_id, key)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartError> {
        CartItemRepository::new(&self.pool).clear(self.user_id).await?;
        Ok(())
    }
}

// =============================================================================
// Request-scoped store
// =============================================================================

/// The store that applies to the current request.
#[derive(Clone)]
pub enum ActiveCartStore {
    /// Anonymous visitor.
    Guest(SessionCartStore),
    /// Signed-in user.
    Server(DbCartStore),
}

impl ActiveCartStore {
    /// Pick the server cart for a signed-in user, the session cart otherwise.
    #[must_use]
    pub fn for_request(
        session: Session,
        user: Option<&CurrentUser>,
        pool: &PgPool,
        catalog: &CatalogCache,
    ) -> Self {
        match user {
            Some(user) => Self::Server(DbCartStore::new(pool.clone(), user.id)),
            None => Self::Guest(SessionCartStore::new(session, catalog.clone())),
        }
    }
}

impl CartStore for ActiveCartStore {
    async fn load(&self) -> Result<Cart, CartError> {
        match self {
            Self::Guest(store) => store.load().await,
            Self::Server(store) => store.load().await,
        }
    }

    async fn upsert(&self, line: &CartLine) -> Result<(), CartError> {
        match self {
            Self::Guest(store) => store.upsert(line).await,
            Self::Server(store) => store.upsert(line).await,
        }
    }

    async fn upsert_all(&self, lines: &[CartLine]) -> Result<(), CartError> {
        match self {
            Self::Guest(store) => store.upsert_all(lines).await,
            Self::Server(store) => store.upsert_all(lines).await,
        }
    }

    async fn delete(&self, key: &LineKey) -> Result<(), CartError> {
        match self {
            Self::Guest(store) => store.delete(key).await,
            Self::Server(store) => store.delete(key).await,
        }
    }

    async fn clear(&self) -> Result<(), CartError> {
        match self {
            Self::Guest(store) => store.clear().await,
            Self::Server(store) => store.clear().await,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Cart operations over any [`CartStore`].
pub struct CartService<S> {
    store: S,
}

impl<S: CartStore> CartService<S> {
    /// Create a service over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The current cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store cannot be read.
    pub async fn cart(&self) -> Result<Cart, CartError> {
        self.store.load().await
    }

    /// Add one unit of `product` in `size`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidSize` if the product declares sizes and
    /// `size` is not one of them, or a store error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product, size: &str) -> Result<Cart, CartError> {
        if !product.offers_size(size) {
            return Err(CartError::InvalidSize(size.to_owned()));
        }

        let mut cart = self.store.load().await?;
        let change = cart.add(ProductSnapshot::from(product), size);
        self.persist(change).await?;
        Ok(cart)
    }

    /// Set a line's quantity. Quantities below 1 and missing lines change
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store cannot be read or written.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.store.load().await?;
        let change = cart.update_quantity(product_id, size, quantity);
        self.persist(change).await?;
        Ok(cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store cannot be read or written.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId, size: &str) -> Result<Cart, CartError> {
        let mut cart = self.store.load().await?;
        let change = cart.remove(product_id, size);
        self.persist(change).await?;
        Ok(cart)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store cannot be read or written.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, CartError> {
        let mut cart = self.store.load().await?;
        let change = cart.clear();
        self.persist(change).await?;
        Ok(cart)
    }

    async fn persist(&self, change: CartChange) -> Result<(), CartError> {
        match change {
            CartChange::Upserted(line) => self.store.upsert(&line).await,
            CartChange::Removed(key) => self.store.delete(&key).await,
            CartChange::Cleared => self.store.clear().await,
            CartChange::Unchanged => Ok(()),
        }
    }
}

/// Fold the session's guest cart into `user_id`'s server cart.
///
/// Called right after the user is stored in the session. See
/// [`merge_carts`].
///
/// # Errors
///
/// Returns `CartError` if either cart cannot be read or written. The guest
/// cart is kept in that case.
#[instrument(skip(session, pool, catalog))]
pub async fn merge_guest_cart(
    session: &Session,
    pool: &PgPool,
    catalog: &CatalogCache,
    user_id: UserId,
) -> Result<Cart, CartError> {
    merge_carts(
        &SessionCartStore::new(session.clone(), catalog.clone()),
        &DbCartStore::new(pool.clone(), user_id),
    )
    .await
}

/// Fold `guest` into `server`.
///
/// Guest lines are refreshed on load, so lines for deleted products are not
/// carried over. Every merged line is written to `server` in one
/// [`CartStore::upsert_all`], and `guest` is cleared only after that write
/// succeeded. A failed merge leaves `server` as it was and `guest` intact,
/// so retrying it does not count any guest line twice.
///
/// # Errors
///
/// Returns `CartError` if either cart cannot be read or written.
pub async fn merge_carts<G, S>(guest: &G, server: &S) -> Result<Cart, CartError>
where
    G: CartStore + Sync,
    S: CartStore + Sync,
{
    let guest_cart = guest.load().await?;
    let server_cart = server.load().await?;
    if guest_cart.is_empty() {
        return Ok(server_cart);
    }

    let outcome = cart::merge(&guest_cart, &server_cart);
    server.upsert_all(&outcome.upserts).await?;
    guest.clear().await?;

    tracing::info!(
        merged_lines = outcome.upserts.len(),
        "Merged guest cart into server cart"
    );
    Ok(outcome.cart)
}

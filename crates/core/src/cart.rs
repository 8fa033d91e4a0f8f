//! Shopping cart state.
//!
//! A cart is an ordered list of lines. A line is identified by
//! `(product id, size)`: the same product in two sizes is two lines, and
//! adding the same product and size again bumps the existing line's quantity.
//!
//! Every mutating operation returns a [`CartChange`] describing what happened,
//! so the caller can mirror exactly that change into whatever backs the cart
//! (the session for guests, the `cart_items` table for signed-in users)
//! without diffing.
//!
//! # Invariants
//!
//! - At most one line per `(product id, size)`.
//! - Every quantity is between 1 and [`MAX_LINE_QUANTITY`].
//! - [`Cart::total`] is the sum of `price * quantity` over all lines.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{CategoryId, Price, ProductId};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Product fields a cart line needs for display and pricing.
///
/// Guest carts keep this snapshot in the session; server carts rebuild it
/// from the `products` table on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    pub image: Option<String>,
    pub category_id: CategoryId,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            price: product.price,
            image: product.primary_image().map(str::to_owned),
            category_id: product.category_id,
        }
    }
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: String,
}

impl LineKey {
    /// Build a key.
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
        }
    }
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    pub size: String,
    pub quantity: u32,
}

impl CartLine {
    /// This line's identity.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product.id, self.size.clone())
    }

    fn matches(&self, product_id: ProductId, size: &str) -> bool {
        self.product.id == product_id && self.size == size
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// What a cart operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A line was created or its quantity changed; carries the line as it is now.
    Upserted(CartLine),
    /// A line was removed.
    Removed(LineKey),
    /// Every line was removed.
    Cleared,
    /// Nothing changed (missing line, quantity below 1, ...).
    Unchanged,
}

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from stored lines.
    ///
    /// Lines with quantity 0 are dropped and duplicate keys are folded
    /// together, so a cart built from untrusted storage still upholds the
    /// invariants.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity > 0 {
                cart.add_quantity(line.product, &line.size, line.quantity);
            }
        }
        cart
    }

    /// The lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up a line.
    #[must_use]
    pub fn get(&self, product_id: ProductId, size: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, size))
    }

    /// Add one unit of `product` in `size`.
    pub fn add(&mut self, product: ProductSnapshot, size: &str) -> CartChange {
        self.add_quantity(product, size, 1)
    }

    /// Add `quantity` units of `product` in `size`.
    ///
    /// An existing line keeps its position and gets its quantity increased;
    /// its product snapshot is refreshed with the one passed in. The result
    /// is capped at [`MAX_LINE_QUANTITY`]. Adding zero units changes nothing.
    pub fn add_quantity(&mut self, product: ProductSnapshot, size: &str, quantity: u32) -> CartChange {
        if quantity == 0 {
            return CartChange::Unchanged;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(product.id, size)) {
            let quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            if quantity == line.quantity && line.product == product {
                return CartChange::Unchanged;
            }
            line.quantity = quantity;
            line.product = product;
            return CartChange::Upserted(line.clone());
        }

        let line = CartLine {
            product,
            size: size.to_owned(),
            quantity: quantity.min(MAX_LINE_QUANTITY),
        };
        self.lines.push(line.clone());
        CartChange::Upserted(line)
    }

    /// Remove the line for `(product_id, size)`, if present.
    pub fn remove(&mut self, product_id: ProductId, size: &str) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, size));
        if self.lines.len() == before {
            CartChange::Unchanged
        } else {
            CartChange::Removed(LineKey::new(product_id, size))
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// Quantities below 1 are ignored rather than treated as a removal; use
    /// [`Cart::remove`] for that. Quantities above [`MAX_LINE_QUANTITY`] are
    /// capped.
    pub fn update_quantity(&mut self, product_id: ProductId, size: &str, quantity: u32) -> CartChange {
        if quantity < 1 {
            return CartChange::Unchanged;
        }
        let quantity = quantity.min(MAX_LINE_QUANTITY);

        match self.lines.iter_mut().find(|l| l.matches(product_id, size)) {
            Some(line) if line.quantity == quantity => CartChange::Unchanged,
            Some(line) => {
                line.quantity = quantity;
                CartChange::Upserted(line.clone())
            }
            None => CartChange::Unchanged,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) -> CartChange {
        if self.lines.is_empty() {
            return CartChange::Unchanged;
        }
        self.lines.clear();
        CartChange::Cleared
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Refresh product snapshots from the live catalog.
    ///
    /// Lines whose product no longer exists are dropped; their keys are
    /// returned. Guest carts call this on load so prices and names never go
    /// stale.
    pub fn refresh<'a, F>(&mut self, mut lookup: F) -> Vec<LineKey>
    where
        F: FnMut(ProductId) -> Option<&'a Product>,
    {
        let mut dropped = Vec::new();
        self.lines.retain_mut(|line| match lookup(line.product.id) {
            Some(product) => {
                line.product = ProductSnapshot::from(product);
                true
            }
            None => {
                dropped.push(line.key());
                false
            }
        });
        dropped
    }

    /// Read-only summary for API responses.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            lines: self
                .lines
                .iter()
                .map(|line| CartLineView {
                    line_total: line.line_total(),
                    line: line.clone(),
                })
                .collect(),
            total: self.total(),
            total_display: self.total().display(),
            item_count: self.item_count(),
        }
    }
}

/// One line plus its computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Price,
}

/// Cart as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    pub total: Price,
    pub total_display: String,
    pub item_count: u32,
}

/// Result of folding a guest cart into a server cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The server cart after the merge.
    pub cart: Cart,
    /// Server lines that were created or changed and must be persisted.
    pub upserts: Vec<CartLine>,
}

/// Merge a guest cart into a signed-in user's server cart.
///
/// Starts from `server` (keeping its order), then folds in each guest line:
/// a line whose key already exists gets the guest quantity added, anything
/// else is appended. Only lines that actually changed are reported in
/// [`MergeOutcome::upserts`], each once, in its final state.
#[must_use]
pub fn merge(guest: &Cart, server: &Cart) -> MergeOutcome {
    let mut cart = server.clone();
    let mut touched: Vec<LineKey> = Vec::new();

    for line in guest.lines() {
        if let CartChange::Upserted(changed) =
            cart.add_quantity(line.product.clone(), &line.size, line.quantity)
        {
            let key = changed.key();
            if !touched.contains(&key) {
                touched.push(key);
            }
        }
    }

    let upserts = touched
        .iter()
        .filter_map(|key| cart.get(key.product_id, &key.size).cloned())
        .collect();

    MergeOutcome { cart, upserts }
}

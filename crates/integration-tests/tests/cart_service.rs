//! `CartService` over an in-memory store, checking exactly what gets written.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use urban_style_core::cart::{Cart, CartLine, LineKey, ProductSnapshot};
use urban_style_core::catalog::Product;
use urban_style_core::{CategoryId, Price, ProductId};
use urban_style_storefront::db::RepositoryError;
use urban_style_storefront::services::cart::{CartError, CartService, CartStore, merge_carts};

/// A write the service issued.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Write {
    Upsert(LineKey, u32),
    UpsertAll(Vec<(LineKey, u32)>),
    Delete(LineKey),
    Clear,
}

#[derive(Clone, Default)]
struct MemoryCartStore {
    lines: Arc<Mutex<Vec<CartLine>>>,
    writes: Arc<Mutex<Vec<Write>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryCartStore {
    fn with_lines(lines: Vec<CartLine>) -> Self {
        let store = Self::default();
        *store.lines.lock().unwrap() = lines;
        store
    }

    /// Make every later write fail like an unreachable database.
    fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), CartError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut).into());
        }
        Ok(())
    }

    fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn quantity(&self, product: &Product, size: &str) -> Option<u32> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.key() == LineKey::new(product.id, size))
            .map(|l| l.quantity)
    }
}

impl CartStore for MemoryCartStore {
    async fn load(&self) -> Result<Cart, CartError> {
        Ok(Cart::from_lines(self.lines.lock().unwrap().clone()))
    }

    async fn upsert(&self, line: &CartLine) -> Result<(), CartError> {
        self.check_writable()?;
        let mut lines = self.lines.lock().unwrap();
        match lines.iter_mut().find(|l| l.key() == line.key()) {
            Some(existing) => existing.clone_from(line),
            None => lines.push(line.clone()),
        }
        self.writes
            .lock()
            .unwrap()
            .push(Write::Upsert(line.key(), line.quantity));
        Ok(())
    }

    async fn upsert_all(&self, lines: &[CartLine]) -> Result<(), CartError> {
        self.check_writable()?;
        let mut stored = self.lines.lock().unwrap();
        for line in lines {
            match stored.iter_mut().find(|l| l.key() == line.key()) {
                Some(existing) => existing.clone_from(line),
                None => stored.push(line.clone()),
            }
        }
        self.writes.lock().unwrap().push(Write::UpsertAll(
            lines.iter().map(|l| (l.key(), l.quantity)).collect(),
        ));
        Ok(())
    }

    async fn delete(&self, key: &LineKey) -> Result<(), CartError> {
        self.check_writable()?;
        self.lines.lock().unwrap().retain(|l| l.key() != *key);
        self.writes.lock().unwrap().push(Write::Delete(key.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.check_writable()?;
        self.lines.lock().unwrap().clear();
        self.writes.lock().unwrap().push(Write::Clear);
        Ok(())
    }
}

fn line(product: &Product, size: &str, quantity: u32) -> CartLine {
    CartLine {
        product: ProductSnapshot::from(product),
        size: size.to_string(),
        quantity,
    }
}

fn hoodie(sizes: &[&str]) -> Product {
    Product {
        id: ProductId::generate(),
        name: "Shadow Box Hoodie".to_string(),
        slug: "shadow-box-hoodie".to_string(),
        description: String::new(),
        price: Price::from_rupiah(459_000),
        stock: 40,
        category_id: CategoryId::generate(),
        images: vec!["https://cdn.urbanstyle.id/hoodie.jpg".to_string()],
        sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
        featured: false,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_add_writes_final_line_state() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());
    let product = hoodie(&["M", "L"]);

    service.add(&product, "M").await.unwrap();
    let cart = service.add(&product, "M").await.unwrap();

    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.total(), Price::from_rupiah(918_000));

    let key = LineKey::new(product.id, "M");
    assert_eq!(
        store.writes(),
        vec![Write::Upsert(key.clone(), 1), Write::Upsert(key, 2)]
    );
}

#[tokio::test]
async fn test_sizes_are_separate_lines() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());
    let product = hoodie(&["M", "L"]);

    service.add(&product, "M").await.unwrap();
    let cart = service.add(&product, "L").await.unwrap();

    assert_eq!(cart.lines().len(), 2);
    assert_eq!(store.load().await.unwrap().lines().len(), 2);
}

#[tokio::test]
async fn test_unknown_size_is_rejected_without_writing() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());

    let result = service.add(&hoodie(&["M", "L"]), "XXL").await;

    assert!(matches!(result, Err(CartError::InvalidSize(size)) if size == "XXL"));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_one_size_product_accepts_empty_size() {
    let service = CartService::new(MemoryCartStore::default());
    let cart = service.add(&hoodie(&[]), "").await.unwrap();
    assert_eq!(cart.item_count(), 1);
}

#[tokio::test]
async fn test_quantity_below_one_changes_nothing() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());
    let product = hoodie(&["M"]);
    service.add(&product, "M").await.unwrap();

    let cart = service.update_quantity(product.id, "M", 0).await.unwrap();

    assert_eq!(cart.item_count(), 1);
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test]
async fn test_update_and_remove() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());
    let product = hoodie(&["M"]);
    service.add(&product, "M").await.unwrap();

    let cart = service.update_quantity(product.id, "M", 5).await.unwrap();
    assert_eq!(cart.item_count(), 5);

    let cart = service.remove(product.id, "M").await.unwrap();
    assert!(cart.is_empty());

    let key = LineKey::new(product.id, "M");
    assert_eq!(store.writes()[1..], [Write::Upsert(key.clone(), 5), Write::Delete(key)]);
}

#[tokio::test]
async fn test_missing_line_is_not_written() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());

    service
        .update_quantity(ProductId::generate(), "M", 3)
        .await
        .unwrap();
    service.remove(ProductId::generate(), "M").await.unwrap();

    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_clear() {
    let store = MemoryCartStore::default();
    let service = CartService::new(store.clone());
    service.add(&hoodie(&["M"]), "M").await.unwrap();

    let cart = service.clear().await.unwrap();

    assert!(cart.is_empty());
    assert!(store.load().await.unwrap().is_empty());
    assert_eq!(store.writes().last(), Some(&Write::Clear));
}

#[tokio::test]
async fn test_clear_empty_cart_writes_nothing() {
    let store = MemoryCartStore::default();
    let cart = CartService::new(store.clone()).clear().await.unwrap();

    assert!(cart.is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_merge_sums_lines_and_clears_guest() {
    let tee = hoodie(&["M", "L"]);
    let cap = hoodie(&[]);
    let guest = MemoryCartStore::with_lines(vec![line(&tee, "M", 2), line(&cap, "", 1)]);
    let server = MemoryCartStore::with_lines(vec![line(&tee, "M", 1), line(&tee, "L", 4)]);

    let merged = merge_carts(&guest, &server).await.unwrap();

    assert_eq!(merged.item_count(), 8);
    assert_eq!(server.quantity(&tee, "M"), Some(3));
    assert_eq!(server.quantity(&tee, "L"), Some(4));
    assert_eq!(server.quantity(&cap, ""), Some(1));
    assert_eq!(
        server.writes(),
        vec![Write::UpsertAll(vec![
            (LineKey::new(tee.id, "M"), 3),
            (LineKey::new(cap.id, ""), 1),
        ])]
    );

    assert!(guest.load().await.unwrap().is_empty());
    assert_eq!(guest.writes(), vec![Write::Clear]);
}

#[tokio::test]
async fn test_failed_merge_keeps_guest_cart() {
    let tee = hoodie(&["M"]);
    let guest = MemoryCartStore::with_lines(vec![line(&tee, "M", 2)]);
    let server = MemoryCartStore::with_lines(vec![line(&tee, "M", 1)]);
    server.fail_writes();

    let result = merge_carts(&guest, &server).await;

    assert!(matches!(result, Err(CartError::Repository(_))));
    assert_eq!(server.quantity(&tee, "M"), Some(1));
    assert_eq!(guest.quantity(&tee, "M"), Some(2));
    assert!(guest.writes().is_empty());
}

#[tokio::test]
async fn test_merge_with_empty_guest_writes_nothing() {
    let tee = hoodie(&["M"]);
    let guest = MemoryCartStore::default();
    let server = MemoryCartStore::with_lines(vec![line(&tee, "M", 1)]);

    let merged = merge_carts(&guest, &server).await.unwrap();

    assert_eq!(merged.item_count(), 1);
    assert!(server.writes().is_empty());
    assert!(guest.writes().is_empty());
}

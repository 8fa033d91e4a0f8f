//! Repository and cart-store tests against a real database.
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch `PostgreSQL` database
//! and `cargo test -- --ignored`. Every test creates its own customer and
//! catalog rows, so they can share one database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tower_sessions::{MemoryStore, Session};

use urban_style_core::cart::{Cart, CartLine, LineKey, ProductSnapshot};
use urban_style_core::catalog::{CategoryDraft, Product, ProductDraft};
use urban_style_core::checkout::{CheckoutForm, OrderDraft};
use urban_style_core::{Email, PaymentMethod, Price, ProductId, UserId};
use urban_style_storefront::db::{
    CartItemRepository, CategoryRepository, OrderRepository, ProductRepository, UserRepository,
};
use urban_style_storefront::models::session_keys;
use urban_style_storefront::services::cart::{
    CartService, CartStore, DbCartStore, SessionCartStore, merge_carts,
};
use urban_style_storefront::services::catalog::CatalogCache;

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .unwrap();
    pool
}

fn tag() -> String {
    ProductId::generate().to_string().replace('-', "")
}

async fn customer(pool: &PgPool) -> (UserId, Email) {
    let email = Email::parse(&format!("cart-{}@example.com", tag())).unwrap();
    let user = UserRepository::new(pool)
        .create_with_password(&email, Some("Raka Pratama"), "unused-hash")
        .await
        .unwrap();
    (user.id, email)
}

/// Two products (a tee in M/L and a one-size cap) in a fresh category.
async fn catalog(pool: &PgPool) -> (Product, Product) {
    let tag = tag();
    let category = CategoryRepository::new(pool)
        .create(&CategoryDraft {
            name: format!("Drop {tag}"),
            slug: format!("drop-{tag}"),
            description: String::new(),
        })
        .await
        .unwrap();

    let product = |name: &str, price: u64, sizes: &[&str]| ProductDraft {
        name: name.to_string(),
        slug: format!("{}-{tag}", name.to_lowercase().replace(' ', "-")),
        description: String::new(),
        price: Price::from_rupiah(price),
        stock: 25,
        category_id: category.id,
        images: Vec::new(),
        sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
        featured: false,
    };

    let products = ProductRepository::new(pool);
    let tee = products
        .create(&product("Box Logo Tee", 189_000, &["M", "L"]))
        .await
        .unwrap();
    let cap = products
        .create(&product("Six Panel Cap", 129_000, &[]))
        .await
        .unwrap();
    (tee, cap)
}

fn line(product: &Product, size: &str, quantity: u32) -> CartLine {
    CartLine {
        product: ProductSnapshot::from(product),
        size: size.to_string(),
        quantity,
    }
}

fn form(email: &Email) -> CheckoutForm {
    CheckoutForm {
        name: "Raka Pratama".to_string(),
        email: email.to_string(),
        phone: "081234567890".to_string(),
        address: "Jl. Kemang Raya 12".to_string(),
        city: "Jakarta".to_string(),
        postal_code: "12730".to_string(),
        payment_method: PaymentMethod::BankTransfer,
    }
}

fn quantity(cart: &Cart, product: &Product, size: &str) -> Option<u32> {
    cart.get(product.id, size).map(|l| l.quantity)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_cart_upsert_overwrites_existing_line() {
    let pool = pool().await;
    let (user, _) = customer(&pool).await;
    let (tee, _) = catalog(&pool).await;
    let repo = CartItemRepository::new(&pool);

    repo.upsert(user, &line(&tee, "M", 2)).await.unwrap();
    repo.upsert(user, &line(&tee, "M", 5)).await.unwrap();
    repo.upsert(user, &line(&tee, "L", 1)).await.unwrap();

    let lines = repo.list(user).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].key(), LineKey::new(tee.id, "M"));
    assert_eq!(lines[0].quantity, 5);
    assert_eq!(lines[1].quantity, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_upsert_all_is_all_or_nothing() {
    let pool = pool().await;
    let (user, _) = customer(&pool).await;
    let (tee, cap) = catalog(&pool).await;
    let repo = CartItemRepository::new(&pool);
    repo.upsert(user, &line(&tee, "M", 1)).await.unwrap();

    let mut deleted = line(&cap, "", 1);
    deleted.product.id = ProductId::generate();
    let result = repo
        .upsert_all(user, &[line(&tee, "M", 4), deleted])
        .await;
    assert!(result.is_err());

    let lines = repo.list(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 1);

    repo.upsert_all(user, &[line(&tee, "M", 4), line(&cap, "", 2)])
        .await
        .unwrap();
    let cart = Cart::from_lines(repo.list(user).await.unwrap());
    assert_eq!(quantity(&cart, &tee, "M"), Some(4));
    assert_eq!(quantity(&cart, &cap, ""), Some(2));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_clear_removes_server_cart() {
    let pool = pool().await;
    let (user, _) = customer(&pool).await;
    let (tee, cap) = catalog(&pool).await;
    let service = CartService::new(DbCartStore::new(pool.clone(), user));

    service.add(&tee, "M").await.unwrap();
    service.add(&cap, "").await.unwrap();
    let cart = service.clear().await.unwrap();

    assert!(cart.is_empty());
    assert!(CartItemRepository::new(&pool).list(user).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_place_takes_only_ordered_units_from_cart() {
    let pool = pool().await;
    let (user, email) = customer(&pool).await;
    let (tee, cap) = catalog(&pool).await;
    let repo = CartItemRepository::new(&pool);

    repo.upsert(user, &line(&tee, "M", 2)).await.unwrap();
    repo.upsert(user, &line(&tee, "L", 1)).await.unwrap();
    let cart = Cart::from_lines(repo.list(user).await.unwrap());
    let draft = OrderDraft::build(&cart, &form(&email)).unwrap();

    // Changes made after the draft was built.
    repo.upsert(user, &line(&tee, "M", 3)).await.unwrap();
    repo.upsert(user, &line(&cap, "", 1)).await.unwrap();

    let order = OrderRepository::new(&pool).place(user, &draft).await.unwrap();
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.item_count(), 3);

    let left = Cart::from_lines(repo.list(user).await.unwrap());
    assert_eq!(quantity(&left, &tee, "M"), Some(1));
    assert_eq!(quantity(&left, &tee, "L"), None);
    assert_eq!(quantity(&left, &cap, ""), Some(1));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_guest_cart_merges_into_server_cart_once() {
    let pool = pool().await;
    let (user, _) = customer(&pool).await;
    let (tee, cap) = catalog(&pool).await;

    let session = Session::new(None, Arc::new(MemoryStore::default()), None);
    session
        .insert(
            session_keys::GUEST_CART,
            Cart::from_lines([line(&tee, "M", 2), line(&cap, "", 1)]),
        )
        .await
        .unwrap();
    CartItemRepository::new(&pool)
        .upsert(user, &line(&tee, "M", 1))
        .await
        .unwrap();

    let guest = SessionCartStore::new(
        session.clone(),
        CatalogCache::new(pool.clone(), Duration::from_secs(60)),
    );
    let server = DbCartStore::new(pool.clone(), user);

    let merged = merge_carts(&guest, &server).await.unwrap();
    assert_eq!(quantity(&merged, &tee, "M"), Some(3));
    assert_eq!(quantity(&merged, &cap, ""), Some(1));
    assert!(guest.load().await.unwrap().is_empty());

    // A second sign-in on the same session has nothing left to add.
    let again = merge_carts(&guest, &server).await.unwrap();
    assert_eq!(again, server.load().await.unwrap());
    assert_eq!(quantity(&again, &tee, "M"), Some(3));
}

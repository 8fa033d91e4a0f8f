//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `cart` - Guest and server carts behind one interface, merge on login
//! - `catalog` - Cached product and category reads
//! - `checkout` - Checkout form and order placement

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

//! Urban Style Core - Shared types and storefront domain logic.
//!
//! This crate provides the types and pure logic used by every Urban Style
//! component:
//! - `storefront` - JSON API for the shop and its back office
//! - `cli` - Command-line tools for migrations, seeding and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Everything that decides *what* a cart, a catalog
//! page, a checkout total or a sales report looks like lives here, so it can
//! be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, order numbers and statuses
//! - [`catalog`] - Product/category models, catalog filtering and pagination
//! - [`cart`] - Cart lines keyed by `(product, size)` and guest/server merge
//! - [`checkout`] - Shipping form validation, shipping cost and order drafts
//! - [`reports`] - Dashboard and sales report aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod reports;
pub mod types;

pub use types::*;

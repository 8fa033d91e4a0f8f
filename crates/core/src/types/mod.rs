//! Core types for the Urban Style storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::{InvalidOrderNumber, OrderNumber};
pub use price::{NegativePrice, Price};
pub use slug::{is_valid_slug, slugify};
pub use status::*;

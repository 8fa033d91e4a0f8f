//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use urban_style_core::{Email, UserId, UserRole};

/// A storefront account (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name given at registration.
    pub full_name: Option<String>,
    /// Customer or admin.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to greet the user with: full name, else the email local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

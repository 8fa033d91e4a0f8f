//! Session-related types.
//!
//! Types stored in the session for authentication and guest cart state.

use serde::{Deserialize, Serialize};

use urban_style_core::{Email, UserId, UserRole};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. The
/// role is a snapshot from login time; back-office access re-checks it
/// against the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Role at login time.
    pub role: UserRole,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.display_name().to_owned(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest cart (anonymous sessions only).
    pub const GUEST_CART: &str = "guest_cart";
}

//! Admin role management.
//!
//! Accounts are created through `POST /api/auth/register`; these commands
//! only change the role of an existing account.

use thiserror::Error;

use urban_style_core::{Email, UserRole};
use urban_style_storefront::db::{RepositoryError, UserRepository};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with this email.
    #[error("No account found with email: {0}")]
    UnknownUser(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// Grant the admin role.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

/// Return an account to the customer role.
pub async fn demote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Customer).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&parsed, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %role, "Role updated");
    Ok(())
}

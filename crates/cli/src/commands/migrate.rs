//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` and then creates the
//! `tower_sessions.session` table used by the session store.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration error: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Run all migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

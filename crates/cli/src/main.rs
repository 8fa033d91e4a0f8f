//! Urban Style CLI - Database migrations, seeding and admin management.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and the session table
//! us-cli migrate
//!
//! # Grant the admin role to an existing account
//! us-cli admin promote -e owner@urbanstyle.id
//!
//! # Load categories and products from a YAML file
//! us-cli seed -f catalog.yaml
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "us-cli")]
#[command(author, version, about = "Urban Style CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (schema and session store)
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the customer role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
            AdminAction::Demote { email } => commands::admin::demote(&email).await?,
        },
        Commands::Seed { file } => {
            let summary = commands::seed::catalog(&file).await?;
            tracing::info!(
                categories = summary.categories_created,
                products = summary.products_created,
                skipped = summary.skipped,
                "Seeding complete"
            );
        }
    }
    Ok(())
}

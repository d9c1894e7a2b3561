//! # Atelier Back-Office
//!
//! Command-line surface over the sale, return and stock operations.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Back-Office Binary                             │
//! │                                                                         │
//! │  argv ───► Cli ───► atelier-db ───► SQLite (--db / ATELIER_DB_PATH)    │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        stdout: JSON result    stderr: {"code", "message"}, exit 1      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```bash
//! echo '{"customer_id": "...", "items": [...]}' | backoffice create-sale
//! backoffice set-status <sale-id> paid
//! RUST_LOG=atelier_db=debug backoffice adjust-stock <variant-id> -2
//! ```

mod commands;
mod config;
mod error;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::{execute, Cli};
use crate::config::BackofficeConfig;
use atelier_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    // Usage errors and --help exit here (status 2 / 0).
    let cli = Cli::parse();

    let mut config = BackofficeConfig::load().context("loading configuration")?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }
    info!(
        db_path = %config.db_path,
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening database {}", config.db_path))?;

    let outcome = execute(&db, cli.command).await;
    db.close().await;

    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show all debug logs
/// - `RUST_LOG=atelier_db=debug` - Show only database debug logs
/// - Default: INFO level, debug for atelier crates
///
/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atelier=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

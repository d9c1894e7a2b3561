//! # Back-Office Commands
//!
//! One command per invocation. Write commands take a JSON payload from
//! `--json <text>`, `--file <path>` or stdin.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backoffice create-sale --file sale.json                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cli::parse() ──► Command::CreateSale { payload: --file sale.json }    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  execute(&db, command) ──► db.sales().create_sale(&new_sale)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  serde_json::Value  (SaleDetail)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{CommandError, CommandResult};
use atelier_core::{
    NewReturn, NewSale, SaleDetailsUpdate, SaleFilter, SaleItemChanges, SaleStatus,
};
use atelier_db::{Database, DEFAULT_LOW_STOCK_THRESHOLD};

#[derive(Debug, Parser)]
#[command(name = "backoffice", version)]
#[command(about = "Garment shop back-office: sales, returns and stock")]
#[command(after_help = "Pool settings: ATELIER_MAX_CONNECTIONS, ATELIER_CONNECT_TIMEOUT_SECS, \
ATELIER_RUN_MIGRATIONS. Logging: RUST_LOG.")]
pub struct Cli {
    /// SQLite database file (`:memory:` for a throwaway database)
    #[arg(long, global = true, value_name = "PATH", env = "ATELIER_DB_PATH")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

// =============================================================================
// Payload
// =============================================================================

/// Where a command's JSON body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl Payload {
    pub fn read<T: DeserializeOwned>(&self) -> CommandResult<T> {
        let text = match self {
            Payload::Inline(text) => text.clone(),
            Payload::File(path) => std::fs::read_to_string(path)?,
            Payload::Stdin => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        Ok(serde_json::from_str(&text)?)
    }
}

/// `--json` / `--file` options shared by every write command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct PayloadArgs {
    /// Inline JSON body
    #[arg(long, value_name = "TEXT", conflicts_with = "file")]
    pub json: Option<String>,

    /// Read the JSON body from a file (stdin when neither is given)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn source(&self) -> Payload {
        match (&self.json, &self.file) {
            (Some(text), _) => Payload::Inline(text.clone()),
            (None, Some(path)) => Payload::File(path.clone()),
            (None, None) => Payload::Stdin,
        }
    }

    pub fn read<T: DeserializeOwned>(&self) -> CommandResult<T> {
        self.source().read()
    }
}

// =============================================================================
// Command
// =============================================================================

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Create a sale from a NewSale payload
    CreateSale {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Change quantity, price or discount of a sale line (SaleItemChanges payload)
    UpdateSaleItem {
        item_id: String,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Remove a line and restore its stock
    DeleteSaleItem { item_id: String },
    /// Delete a sale without returns and restore its stock
    DeleteSale { sale_id: String },
    /// Forward-only status transition
    SetStatus { sale_id: String, status: SaleStatus },
    /// Any status change except leaving `returned`
    AdminSetStatus { sale_id: String, status: SaleStatus },
    /// Update payment method, seller or notes (SaleDetailsUpdate payload)
    UpdateSaleDetails {
        sale_id: String,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Show a sale with its lines, by id or number
    #[command(name = "sale")]
    ShowSale {
        #[arg(value_name = "SALE_ID_OR_NUMBER")]
        key: String,
    },
    /// List sales, newest first
    ListSales {
        #[arg(long = "customer", value_name = "CUSTOMER_ID")]
        customer_id: Option<String>,
        #[arg(long)]
        status: Option<SaleStatus>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Re-derive totals from the stored lines and report drift
    VerifySale { sale_id: String },

    /// Register a return from a NewReturn payload
    CreateReturn {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Delete a return and take its restored stock back
    DeleteReturn { return_id: String },
    /// Delete one return line
    DeleteReturnItem { return_item_id: String },
    /// Show a return with its lines
    #[command(name = "return")]
    ShowReturn { return_id: String },
    /// List the returns of a sale
    ListReturns { sale_id: String },

    /// Add or remove stock; the result never drops below zero
    AdjustStock {
        variant_id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Overwrite a variant's stock
    SetStock {
        variant_id: String,
        #[arg(value_name = "VALUE")]
        stock: i64,
    },
    /// Show a variant's stock
    #[command(name = "stock")]
    ShowStock { variant_id: String },
    /// Active variants at or below a threshold
    LowStock {
        #[arg(default_value_t = DEFAULT_LOW_STOCK_THRESHOLD)]
        threshold: i64,
    },
}

fn to_json<T: Serialize>(value: &T) -> CommandResult<Value> {
    Ok(serde_json::to_value(value)?)
}

// =============================================================================
// Execution
// =============================================================================

/// Runs a command and returns what should be printed.
pub async fn execute(db: &Database, command: Command) -> CommandResult<Value> {
    debug!(command = ?command, "Executing command");

    match command {
        // ---------------------------------------------------------------------
        // Sales
        // ---------------------------------------------------------------------
        Command::CreateSale { payload } => {
            let new_sale: NewSale = payload.read()?;
            to_json(&db.sales().create_sale(&new_sale).await?)
        }
        Command::UpdateSaleItem { item_id, payload } => {
            let changes: SaleItemChanges = payload.read()?;
            to_json(&db.sales().update_sale_item(&item_id, &changes).await?)
        }
        Command::DeleteSaleItem { item_id } => {
            db.sales().delete_sale_item(&item_id).await?;
            Ok(json!({ "deleted": item_id }))
        }
        Command::DeleteSale { sale_id } => {
            db.sales().delete_sale(&sale_id).await?;
            Ok(json!({ "deleted": sale_id }))
        }
        Command::SetStatus { sale_id, status } => {
            to_json(&db.sales().update_sale_status(&sale_id, status).await?)
        }
        Command::AdminSetStatus { sale_id, status } => {
            to_json(&db.sales().admin_set_status(&sale_id, status).await?)
        }
        Command::UpdateSaleDetails { sale_id, payload } => {
            let update: SaleDetailsUpdate = payload.read()?;
            to_json(&db.sales().update_sale_details(&sale_id, &update).await?)
        }
        Command::ShowSale { key } => {
            let sales = db.sales();
            let detail = match sales.get_sale_detail(&key).await? {
                Some(detail) => Some(detail),
                None => match sales.get_sale_by_number(&key).await? {
                    Some(sale) => sales.get_sale_detail(&sale.id).await?,
                    None => None,
                },
            };
            let detail = detail.ok_or_else(|| CommandError::not_found("Sale", &key))?;
            to_json(&detail)
        }
        Command::ListSales {
            customer_id,
            status,
            limit,
        } => {
            let filter = SaleFilter {
                customer_id,
                status,
                limit,
            };
            to_json(&db.sales().list_sales(&filter).await?)
        }
        Command::VerifySale { sale_id } => {
            to_json(&db.sales().verify_sale_totals(&sale_id).await?)
        }

        // ---------------------------------------------------------------------
        // Returns
        // ---------------------------------------------------------------------
        Command::CreateReturn { payload } => {
            let new_return: NewReturn = payload.read()?;
            to_json(&db.returns().create_return(&new_return).await?)
        }
        Command::DeleteReturn { return_id } => {
            db.returns().delete_return(&return_id).await?;
            Ok(json!({ "deleted": return_id }))
        }
        Command::DeleteReturnItem { return_item_id } => {
            db.returns().delete_return_item(&return_item_id).await?;
            Ok(json!({ "deleted": return_item_id }))
        }
        Command::ShowReturn { return_id } => {
            let detail = db
                .returns()
                .get_return_detail(&return_id)
                .await?
                .ok_or_else(|| CommandError::not_found("Return", &return_id))?;
            to_json(&detail)
        }
        Command::ListReturns { sale_id } => {
            to_json(&db.returns().list_returns_for_sale(&sale_id).await?)
        }

        // ---------------------------------------------------------------------
        // Stock
        // ---------------------------------------------------------------------
        Command::AdjustStock { variant_id, delta } => {
            let adjustment = db.stock().adjust_stock(&variant_id, delta).await?;
            Ok(json!({
                "variant_id": variant_id,
                "previous": adjustment.previous,
                "delta": adjustment.delta,
                "stock": adjustment.new_stock,
                "clamped": adjustment.clamped(),
            }))
        }
        Command::SetStock { variant_id, stock } => {
            db.stock().set_stock(&variant_id, stock).await?;
            Ok(json!({ "variant_id": variant_id, "stock": stock }))
        }
        Command::ShowStock { variant_id } => {
            let stock = db.stock().get_stock(&variant_id).await?;
            Ok(json!({ "variant_id": variant_id, "stock": stock }))
        }
        Command::LowStock { threshold } => to_json(&db.catalog().low_stock(threshold).await?),
    }
}

//! # atelier-db: Database Layer for the Atelier Back-Office
//!
//! SQLite persistence for customers, the garment catalog, the variant stock
//! ledger, sales and returns. Queries run through sqlx at runtime.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Back-Office Data Flow                           │
//! │                                                                         │
//! │  backoffice create-sale < sale.json                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    atelier-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ReturnRepo    │    │ 001_initial  │  │   │
//! │  │   │               │    │ StockLedger   │    │ _schema.sql  │  │   │
//! │  │   │               │    │ Catalog/Cust. │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./atelier.db (ATELIER_DB_PATH)                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rules (pricing, status edges, return planning) live in
//! `atelier-core`; this crate applies them inside transactions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("atelier.db")).await?;
//!
//! let detail = db.sales().create_sale(&new_sale).await?;
//! db.sales().update_sale_status(&detail.sale.id, SaleStatus::Paid).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, DEFAULT_LOW_STOCK_THRESHOLD};
pub use repository::customer::CustomerRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockLedger;

//! # Repository Module
//!
//! Database repositories for the back-office.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repositories and Ledger                          │
//! │                                                                         │
//! │  backoffice command                                                    │
//! │       │                                                                 │
//! │       │  db.sales().create_sale(&new_sale)                             │
//! │       ▼                                                                 │
//! │  SaleRepository ──────┐        ReturnRepository ──────┐                │
//! │  ├── create_sale      │        ├── create_return      │                │
//! │  ├── update_sale_item │        ├── delete_return_item │                │
//! │  ├── delete_sale_item │        └── delete_return      │                │
//! │  └── update_status    │                               │                │
//! │                       ▼                               ▼                │
//! │                 stock::{reserve, adjust, restore}   sequence           │
//! │                 (joins the caller's transaction)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers
//! - [`CatalogRepository`](catalog::CatalogRepository) - Categories, sizes, colors, garments, variants
//! - [`StockLedger`](stock::StockLedger) - Manual stock corrections
//! - [`SaleRepository`](sale::SaleRepository) - Sales and their lines
//! - [`ReturnRepository`](returns::ReturnRepository) - Returns against paid sales

pub mod catalog;
pub mod customer;
pub mod returns;
pub mod sale;
pub mod sequence;
pub mod stock;

//! # atelier-core: Pure Business Logic for the Atelier Back-Office
//!
//! This crate holds the rules that keep stock, sale totals and return quantities
//! consistent. Everything here is a pure function over plain data; the
//! transactional plumbing lives in `atelier-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Atelier Back-Office                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/backoffice (command line)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              atelier-db (transactions, SQLite)                  │   │
//! │  │   create_sale ─ create_return ─ adjust_stock ─ status updates   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls into                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atelier-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   types · money · pricing · ledger · status · returns           │   │
//! │  │   validation · sale_number · error                              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Variant, Sale, SaleItem, Return, ...)
//! - [`money`] - Integer money type (cents)
//! - [`pricing`] - Line subtotals and sale header totals
//! - [`ledger`] - Stock adjustment policy (clamp at zero, reservation check)
//! - [`status`] - Sale status transition rules
//! - [`returns`] - Returnable quantity rules
//! - [`sale_number`] - Human-readable sequential sale numbers
//! - [`validation`] - Input validation for new sales and returns
//! - [`error`] - Domain error kinds
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::money::Money;
//! use atelier_core::pricing::line_subtotal;
//!
//! let subtotal = line_subtotal(3, Money::from_cents(10_000), Money::zero()).unwrap();
//! assert_eq!(subtotal.cents(), 30_000);
//! ```

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod returns;
pub mod sale_number;
pub mod status;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of line items in a single sale or return.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Width of the zero-padded sale number ("00000001").
pub const SALE_NUMBER_WIDTH: usize = 8;

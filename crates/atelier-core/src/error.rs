//! # Error Types
//!
//! Domain-specific error kinds for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atelier-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations (tagged, with codes)  │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  atelier-db errors (separate crate)                                    │
//! │  └── DbError          - Persistence failures, wraps CoreError          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → back-office output      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` carries enough context for a user-facing message
//! (available stock, remaining returnable quantity, ...) and a stable
//! machine-readable code from [`CoreError::code`].

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the sales/inventory subsystem.
///
/// Any of these aborts the surrounding operation before it becomes visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// The customer exists but has been deactivated.
    #[error("Customer {customer_id} is not active")]
    CustomerInactive { customer_id: String },

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// A sale must contain at least one line item.
    #[error("A sale must include at least one item")]
    EmptySale,

    /// Requested quantity exceeds the variant's sellable stock.
    ///
    /// ## User Workflow
    /// ```text
    /// New sale: variant "Body 0-3m white" × 5
    ///      │
    ///      ▼
    /// Stock check: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 in stock"
    /// ```
    #[error("Insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    InsufficientStock {
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// A line item has a non-positive quantity or price, an oversized discount,
    /// or otherwise cannot be priced.
    #[error("Invalid line item #{index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    /// Same as [`CoreError::InvalidLineItem`] for an existing sale line.
    #[error("Invalid sale item {sale_item_id}: {reason}")]
    InvalidSaleItem { sale_item_id: String, reason: String },

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item not found: {0}")]
    SaleItemNotFound(String),

    /// Returns are only accepted for paid (or already returned) sales.
    #[error("Sale {sale_id} is {status} and cannot be returned")]
    SaleNotReturnable { sale_id: String, status: String },

    /// A return must contain at least one line item.
    #[error("A return must include at least one item")]
    EmptyReturn,

    /// The referenced sale line belongs to another sale.
    #[error("Sale item {sale_item_id} does not belong to sale {sale_id}")]
    ItemNotInSale {
        sale_item_id: String,
        sale_id: String,
    },

    /// Returning more units than were sold (minus earlier returns).
    #[error("Cannot return {requested} of sale item {sale_item_id}: only {remaining} remaining")]
    OverReturn {
        sale_item_id: String,
        remaining: i64,
        requested: i64,
    },

    /// `returned` is terminal.
    #[error("Sale {sale_id} has been returned; its status can no longer change")]
    SaleAlreadyReturned { sale_id: String },

    #[error("Sale status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Line maintenance on a sale whose status forbids it.
    #[error("Sale {sale_id} is {status}, cannot perform operation")]
    InvalidSaleStatus { sale_id: String, status: String },

    #[error("Return not found: {0}")]
    ReturnNotFound(String),

    #[error("Return item not found: {0}")]
    ReturnItemNotFound(String),

    /// Restricted deletion: other rows still point at this record.
    #[error("{entity} {id} is referenced by {referenced_by} and cannot be deleted")]
    RecordReferenced {
        entity: String,
        id: String,
        referenced_by: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Stable error code for callers that branch on the kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            CoreError::CustomerInactive { .. } => "CUSTOMER_INACTIVE",
            CoreError::VariantNotFound(_) => "VARIANT_NOT_FOUND",
            CoreError::EmptySale => "EMPTY_SALE",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::InvalidLineItem { .. } | CoreError::InvalidSaleItem { .. } => {
                "INVALID_LINE_ITEM"
            }
            CoreError::SaleNotFound(_) => "SALE_NOT_FOUND",
            CoreError::SaleItemNotFound(_) => "SALE_ITEM_NOT_FOUND",
            CoreError::SaleNotReturnable { .. } => "SALE_NOT_RETURNABLE",
            CoreError::EmptyReturn => "EMPTY_RETURN",
            CoreError::ItemNotInSale { .. } => "ITEM_NOT_IN_SALE",
            CoreError::OverReturn { .. } => "OVER_RETURN",
            CoreError::SaleAlreadyReturned { .. } => "SALE_ALREADY_RETURNED",
            CoreError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            CoreError::InvalidSaleStatus { .. } => "INVALID_SALE_STATUS",
            CoreError::ReturnNotFound(_) => "RETURN_NOT_FOUND",
            CoreError::ReturnItemNotFound(_) => "RETURN_ITEM_NOT_FOUND",
            CoreError::RecordReferenced { .. } => "RECORD_REFERENCED",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    pub(crate) fn invalid_line(index: usize, reason: impl Into<String>) -> Self {
        CoreError::InvalidLineItem {
            index,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

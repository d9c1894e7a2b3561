//! # Pricing
//!
//! Line subtotals and sale header totals.
//!
//! ## Formulae
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  line.subtotal = quantity × unit_price − item_discount                  │
//! │                                                                         │
//! │  sale.subtotal = Σ line.subtotal                                        │
//! │  sale.total    = sale.subtotal − sale.discount + sale.tax               │
//! │                                                                         │
//! │  All amounts in cents. Every term is ≥ 0, and so is every result.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Header totals are never trusted from input: they are derived from the
//! persisted lines every time a line changes.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Sale, SaleItem};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Line Pricing
// =============================================================================

/// Prices a single line.
///
/// Errors are reported against line index 0; use [`price_line`] when pricing
/// a list so the index points at the offending line.
pub fn line_subtotal(quantity: i64, unit_price: Money, item_discount: Money) -> CoreResult<Money> {
    price_line(0, quantity, unit_price, item_discount)
}

/// Prices the line at `index`.
///
/// Rejects non-positive quantity or unit price, negative discounts and
/// discounts larger than the gross amount.
pub fn price_line(
    index: usize,
    quantity: i64,
    unit_price: Money,
    item_discount: Money,
) -> CoreResult<Money> {
    if quantity <= 0 {
        return Err(CoreError::invalid_line(index, "quantity must be at least 1"));
    }
    if !unit_price.is_positive() {
        return Err(CoreError::invalid_line(index, "unit price must be positive"));
    }
    if item_discount.is_negative() {
        return Err(CoreError::invalid_line(index, "item discount must not be negative"));
    }

    let gross = unit_price
        .checked_mul_quantity(quantity)
        .ok_or_else(|| CoreError::invalid_line(index, "line amount overflows"))?;

    if item_discount > gross {
        return Err(CoreError::invalid_line(
            index,
            format!("item discount {} exceeds line amount {}", item_discount, gross),
        ));
    }

    Ok(gross - item_discount)
}

/// Re-prices an existing sale line after an edit.
///
/// Same rules as [`price_line`], with errors naming the sale item.
pub fn reprice_line(
    sale_item_id: &str,
    quantity: i64,
    unit_price: Money,
    item_discount: Money,
) -> CoreResult<Money> {
    let named = |reason: String| CoreError::InvalidSaleItem {
        sale_item_id: sale_item_id.to_string(),
        reason,
    };

    if quantity > MAX_ITEM_QUANTITY {
        return Err(named(format!("quantity cannot exceed {}", MAX_ITEM_QUANTITY)));
    }

    price_line(0, quantity, unit_price, item_discount).map_err(|e| match e {
        CoreError::InvalidLineItem { reason, .. } => named(reason),
        other => other,
    })
}

// =============================================================================
// Sale Totals
// =============================================================================

fn amount_overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

/// Derived header amounts of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Computes header totals from line subtotals and flat header amounts.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::Money;
    /// use atelier_core::pricing::SaleTotals;
    ///
    /// let totals = SaleTotals::compute(
    ///     [Money::from_cents(30_000), Money::from_cents(5_000)],
    ///     Money::from_cents(1_000),
    ///     Money::from_cents(500),
    /// )
    /// .unwrap();
    /// assert_eq!(totals.subtotal.cents(), 35_000);
    /// assert_eq!(totals.total.cents(), 34_500);
    /// ```
    pub fn compute(
        line_subtotals: impl IntoIterator<Item = Money>,
        discount: Money,
        tax: Money,
    ) -> CoreResult<Self> {
        if discount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount".to_string(),
            }
            .into());
        }
        if tax.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "tax".to_string(),
            }
            .into());
        }

        let subtotal = line_subtotals
            .into_iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line))
            .ok_or_else(|| amount_overflow("subtotal"))?;
        let total = subtotal
            .checked_sub(discount)
            .and_then(|t| t.checked_add(tax))
            .ok_or_else(|| amount_overflow("total"))?;

        if total.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "total".to_string(),
            }
            .into());
        }

        Ok(SaleTotals {
            subtotal,
            discount,
            tax,
            total,
        })
    }

    /// Totals of the persisted lines of `sale`, using its stored discount and tax.
    ///
    /// Does not validate the result; a negative total shows up as drift in
    /// [`verify_totals`].
    pub fn from_lines(sale: &Sale, items: &[SaleItem]) -> Self {
        let subtotal: Money = items.iter().map(SaleItem::subtotal).sum();
        SaleTotals {
            subtotal,
            discount: sale.discount(),
            tax: sale.tax(),
            total: subtotal - sale.discount() + sale.tax(),
        }
    }

    /// Totals as currently stored on the header.
    pub fn stored(sale: &Sale) -> Self {
        SaleTotals {
            subtotal: sale.subtotal(),
            discount: sale.discount(),
            tax: sale.tax(),
            total: sale.total(),
        }
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Result of comparing a stored sale against its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsCheck {
    pub sale_id: String,
    pub stored: SaleTotals,
    pub computed: SaleTotals,
    /// Lines whose stored subtotal differs from quantity × price − discount.
    pub drifted_lines: Vec<String>,
}

impl TotalsCheck {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.computed && self.drifted_lines.is_empty()
    }
}

/// Re-derives the totals of `sale` from `items` and reports any drift.
pub fn verify_totals(sale: &Sale, items: &[SaleItem]) -> TotalsCheck {
    let drifted_lines = items
        .iter()
        .filter(|item| {
            let expected = item.unit_price() * item.quantity - item.item_discount();
            expected != item.subtotal()
        })
        .map(|item| item.id.clone())
        .collect();

    TotalsCheck {
        sale_id: sale.id.clone(),
        stored: SaleTotals::stored(sale),
        computed: SaleTotals::from_lines(sale, items),
        drifted_lines,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Stock Ledger Policy
//!
//! Rules for changing `Variant.stock`. The database layer executes them as
//! single statements; this module is the reference semantics and the source
//! of the error values.
//!
//! ```text
//! adjust(delta)    new = max(0, current + delta)     never fails
//! reserve(qty)     current ≥ qty ? current − qty     else INSUFFICIENT_STOCK
//! restore(qty)     adjust(+qty)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Outcome of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub previous: i64,
    pub delta: i64,
    pub new_stock: i64,
}

impl StockAdjustment {
    /// True when the floor at zero swallowed part of a negative delta.
    pub fn clamped(&self) -> bool {
        self.previous.saturating_add(self.delta) < 0
    }
}

/// Applies `delta` to `current`, flooring the result at zero.
///
/// ```rust
/// use atelier_core::ledger::adjust;
///
/// assert_eq!(adjust(5, -2).new_stock, 3);
/// assert_eq!(adjust(2, -5).new_stock, 0);
/// ```
pub fn adjust(current: i64, delta: i64) -> StockAdjustment {
    let new_stock = current.saturating_add(delta).max(0);
    StockAdjustment {
        previous: current,
        delta,
        new_stock,
    }
}

/// Checks that `requested` units can be taken from a variant.
///
/// Inactive variants have no sellable stock and report `available = 0`.
pub fn check_reservation(
    variant_id: &str,
    stock: i64,
    is_active: bool,
    requested: i64,
) -> CoreResult<()> {
    let available = if is_active { stock } else { 0 };
    if requested > available {
        return Err(CoreError::InsufficientStock {
            variant_id: variant_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Stock after a successful reservation.
pub fn reserve(variant_id: &str, stock: i64, is_active: bool, requested: i64) -> CoreResult<i64> {
    check_reservation(variant_id, stock, is_active, requested)?;
    Ok(stock - requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_clamps_at_zero() {
        let a = adjust(3, -5);
        assert_eq!(a.new_stock, 0);
        assert!(a.clamped());

        let b = adjust(3, -3);
        assert_eq!(b.new_stock, 0);
        assert!(!b.clamped());

        assert_eq!(adjust(3, 4).new_stock, 7);
    }

    #[test]
    fn test_reservation() {
        assert_eq!(reserve("v", 10, true, 3).unwrap(), 7);
        assert_eq!(reserve("v", 3, true, 3).unwrap(), 0);

        let err = reserve("v", 2, true, 3).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                variant_id: "v".to_string(),
                available: 2,
                requested: 3
            }
        );
    }

    #[test]
    fn test_inactive_variant_reports_zero_available() {
        let err = check_reservation("v", 50, false, 1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
    }
}

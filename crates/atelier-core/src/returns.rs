//! # Return Rules
//!
//! Validates the lines of a return request against what was sold and what
//! has already been returned.
//!
//! ## Over-Return Check
//! ```text
//! sale item "Body 0-3m" sold 3
//!   earlier returns ........ 1
//!   this request, line #0 .. 1   running total 2 ≤ 3  ✓
//!   this request, line #2 .. 2   running total 4 > 3  ✗ OVER_RETURN(remaining = 1)
//! ```
//!
//! Lines of the same request that point at the same sale item accumulate;
//! `remaining` is what was still returnable before the offending line.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::NewReturnItem;

/// Units of a sale line that can still be returned.
#[inline]
pub fn remaining_returnable(sold: i64, already_returned: i64) -> i64 {
    (sold - already_returned).max(0)
}

/// What the database knows about a sale line referenced by a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnableLine {
    pub sale_item_id: String,
    pub sale_id: String,
    pub variant_id: String,
    pub sold: i64,
    pub already_returned: i64,
}

/// A validated return line, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedReturnLine {
    pub sale_item_id: String,
    /// Variant whose stock receives the units back.
    pub variant_id: String,
    pub quantity: i64,
    pub refund: Money,
}

/// Validated lines of a return plus the default refunded amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPlan {
    pub lines: Vec<PlannedReturnLine>,
    pub refund_total: Money,
}

/// Checks every requested line and builds the return plan.
///
/// `known` maps sale item ids to their current state; a missing entry means
/// the sale item does not exist.
pub fn plan_return(
    sale_id: &str,
    items: &[NewReturnItem],
    known: &HashMap<String, ReturnableLine>,
) -> CoreResult<ReturnPlan> {
    if items.is_empty() {
        return Err(CoreError::EmptyReturn);
    }

    let mut requested_so_far: HashMap<&str, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(CoreError::invalid_line(index, "quantity must be at least 1"));
        }
        if item.refund_cents <= 0 {
            return Err(CoreError::invalid_line(index, "refund amount must be positive"));
        }

        let line = known
            .get(&item.sale_item_id)
            .ok_or_else(|| CoreError::SaleItemNotFound(item.sale_item_id.clone()))?;

        if line.sale_id != sale_id {
            return Err(CoreError::ItemNotInSale {
                sale_item_id: item.sale_item_id.clone(),
                sale_id: sale_id.to_string(),
            });
        }

        let earlier = requested_so_far.entry(item.sale_item_id.as_str()).or_insert(0);
        let remaining = remaining_returnable(line.sold, line.already_returned + *earlier);
        if item.quantity > remaining {
            return Err(CoreError::OverReturn {
                sale_item_id: item.sale_item_id.clone(),
                remaining,
                requested: item.quantity,
            });
        }
        *earlier += item.quantity;

        lines.push(PlannedReturnLine {
            sale_item_id: item.sale_item_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity: item.quantity,
            refund: Money::from_cents(item.refund_cents),
        });
    }

    let refund_total = lines
        .iter()
        .try_fold(Money::zero(), |acc, l| acc.checked_add(l.refund))
        .ok_or_else(|| {
            CoreError::from(ValidationError::OutOfRange {
                field: "refunded_amount".to_string(),
                min: 0,
                max: i64::MAX,
            })
        })?;
    Ok(ReturnPlan {
        lines,
        refund_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(sold: i64, returned: i64) -> HashMap<String, ReturnableLine> {
        let mut map = HashMap::new();
        map.insert(
            "si-1".to_string(),
            ReturnableLine {
                sale_item_id: "si-1".to_string(),
                sale_id: "s-1".to_string(),
                variant_id: "v-1".to_string(),
                sold,
                already_returned: returned,
            },
        );
        map
    }

    fn line(qty: i64, refund: i64) -> NewReturnItem {
        NewReturnItem {
            sale_item_id: "si-1".to_string(),
            quantity: qty,
            refund_cents: refund,
        }
    }

    #[test]
    fn test_remaining_returnable() {
        assert_eq!(remaining_returnable(3, 1), 2);
        assert_eq!(remaining_returnable(3, 5), 0);
    }

    #[test]
    fn test_plan_within_limit() {
        let plan = plan_return("s-1", &[line(1, 10_000)], &known(3, 0)).unwrap();
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].variant_id, "v-1");
        assert_eq!(plan.refund_total.cents(), 10_000);
    }

    #[test]
    fn test_over_return_reports_remaining() {
        let err = plan_return("s-1", &[line(3, 30_000)], &known(3, 1)).unwrap_err();
        assert_eq!(
            err,
            CoreError::OverReturn {
                sale_item_id: "si-1".to_string(),
                remaining: 2,
                requested: 3
            }
        );
    }

    #[test]
    fn test_lines_of_one_request_accumulate() {
        let err = plan_return("s-1", &[line(2, 100), line(2, 100)], &known(3, 0)).unwrap_err();
        assert!(matches!(err, CoreError::OverReturn { remaining: 1, requested: 2, .. }));

        assert!(plan_return("s-1", &[line(1, 100), line(2, 100)], &known(3, 0)).is_ok());
    }

    #[test]
    fn test_line_rejections() {
        assert_eq!(plan_return("s-1", &[], &known(3, 0)).unwrap_err(), CoreError::EmptyReturn);
        assert_eq!(
            plan_return("s-1", &[line(0, 100)], &known(3, 0)).unwrap_err().code(),
            "INVALID_LINE_ITEM"
        );
        assert_eq!(
            plan_return("s-1", &[line(1, 0)], &known(3, 0)).unwrap_err().code(),
            "INVALID_LINE_ITEM"
        );
        assert_eq!(
            plan_return("s-2", &[line(1, 100)], &known(3, 0)).unwrap_err().code(),
            "ITEM_NOT_IN_SALE"
        );
        assert_eq!(
            plan_return("s-1", &[line(1, 100)], &HashMap::new()).unwrap_err().code(),
            "SALE_ITEM_NOT_FOUND"
        );
    }

    #[test]
    fn test_refund_total_overflow_is_rejected() {
        let lines = [line(1, i64::MAX), line(1, i64::MAX)];
        let err = plan_return("s-1", &lines, &known(3, 0)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}

//! # Validation Module
//!
//! Input validation for the back-office payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Payload (serde)                                              │
//! │  └── Types and required keys                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Field formats and lengths                                         │
//! │  └── Line shape: quantities, prices, discounts, duplicates             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: atelier-db transaction                                       │
//! │  ├── Customer active, variant stock, returned quantities               │
//! │  └── SQLite CHECK / UNIQUE / FOREIGN KEY constraints                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs before a transaction is opened, so a rejected
//! payload never touches the database.

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{price_line, SaleTotals};
use crate::status::initial_status;
use crate::types::{NewReturn, NewSale, SaleStatus};
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for field-level validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of free-text fields (notes, descriptions).
pub const MAX_TEXT_LEN: usize = 1000;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required name-like field.
///
/// ```rust
/// use atelier_core::validation::validate_name;
///
/// assert!(validate_name("first_name", "Lucía").is_ok());
/// assert!(validate_name("first_name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates an optional free-text field.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Loose e-mail check: one `@` with something on both sides.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

/// Validates a UUID string.
///
/// ```rust
/// use atelier_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Absolute stock values set through the catalog.
pub fn validate_stock_value(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Catalog prices: cost may be zero, sale price may not.
pub fn validate_catalog_prices(cost_cents: i64, sale_cents: i64) -> ValidationResult<()> {
    if cost_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "cost_price".to_string(),
        });
    }
    if sale_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "sale_price".to_string(),
        });
    }
    Ok(())
}

fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Sale Payload
// =============================================================================

/// A sale payload that passed every check that needs no database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSale {
    pub status: SaleStatus,
    /// Subtotal of each line, in payload order.
    pub line_subtotals: Vec<Money>,
    /// Provisional header totals.
    pub totals: SaleTotals,
}

/// Validates a `create_sale` payload and prices it.
///
/// ## Checks, in order
/// ```text
/// customer_id ─► items non-empty ─► item count ─► per line:
///     variant_id · quantity 1..=999 · price > 0 · 0 ≤ discount ≤ gross · no repeats
/// ─► header discount, tax ≥ 0 and total ≥ 0 ─► initial status
/// ```
pub fn validate_new_sale(sale: &NewSale) -> CoreResult<ValidatedSale> {
    validate_uuid("customer_id", &sale.customer_id)?;

    if sale.items.is_empty() {
        return Err(CoreError::EmptySale);
    }
    validate_line_count("items", sale.items.len())?;
    validate_optional_text("notes", sale.notes.as_deref(), MAX_TEXT_LEN)?;
    validate_optional_text("seller", sale.seller.as_deref(), 100)?;

    let mut seen = HashSet::with_capacity(sale.items.len());
    let mut line_subtotals = Vec::with_capacity(sale.items.len());

    for (index, item) in sale.items.iter().enumerate() {
        if validate_uuid("variant_id", &item.variant_id).is_err() {
            return Err(CoreError::invalid_line(index, "variant_id must be a valid UUID"));
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::invalid_line(
                index,
                format!("quantity cannot exceed {}", MAX_ITEM_QUANTITY),
            ));
        }
        if !seen.insert(item.variant_id.as_str()) {
            return Err(CoreError::invalid_line(
                index,
                format!("variant {} appears more than once", item.variant_id),
            ));
        }

        line_subtotals.push(price_line(
            index,
            item.quantity,
            Money::from_cents(item.unit_price_cents),
            Money::from_cents(item.item_discount_cents),
        )?);
    }

    let totals = SaleTotals::compute(
        line_subtotals.iter().copied(),
        Money::from_cents(sale.discount_cents),
        Money::from_cents(sale.tax_cents),
    )?;
    let status = initial_status(sale.status)?;

    Ok(ValidatedSale {
        status,
        line_subtotals,
        totals,
    })
}

// =============================================================================
// Return Payload
// =============================================================================

/// Shape checks for a `create_return` payload. Quantities against what was
/// sold are checked inside the transaction by [`crate::returns::plan_return`].
pub fn validate_new_return(ret: &NewReturn) -> CoreResult<()> {
    validate_uuid("sale_id", &ret.sale_id)?;

    if ret.items.is_empty() {
        return Err(CoreError::EmptyReturn);
    }
    validate_line_count("items", ret.items.len())?;
    validate_optional_text("description", ret.description.as_deref(), MAX_TEXT_LEN)?;
    validate_optional_text("processed_by", ret.processed_by.as_deref(), 100)?;

    if let Some(refunded) = ret.refunded_cents {
        if refunded < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "refunded_amount".to_string(),
            }
            .into());
        }
    }

    for (index, item) in ret.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(CoreError::invalid_line(index, "quantity must be at least 1"));
        }
        if item.refund_cents <= 0 {
            return Err(CoreError::invalid_line(index, "refund amount must be positive"));
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewReturnItem, NewSaleItem, PaymentMethod, ReturnReason};

    const CUSTOMER: &str = "550e8400-e29b-41d4-a716-446655440000";
    const VARIANT_A: &str = "6f1c2a8e-3b7d-4c1e-9a52-0d4e8b7f1a11";
    const VARIANT_B: &str = "6f1c2a8e-3b7d-4c1e-9a52-0d4e8b7f1a22";

    fn sale_with(items: Vec<NewSaleItem>) -> NewSale {
        NewSale {
            customer_id: CUSTOMER.to_string(),
            sale_date: None,
            discount_cents: 0,
            tax_cents: 0,
            status: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            seller: None,
            items,
        }
    }

    fn item(variant: &str, quantity: i64, unit: i64, discount: i64) -> NewSaleItem {
        NewSaleItem {
            variant_id: variant.to_string(),
            quantity,
            unit_price_cents: unit,
            item_discount_cents: discount,
        }
    }

    #[test]
    fn test_valid_sale_is_priced() {
        let mut sale = sale_with(vec![item(VARIANT_A, 3, 10_000, 0), item(VARIANT_B, 1, 5_000, 500)]);
        sale.discount_cents = 1_000;
        sale.tax_cents = 200;

        let validated = validate_new_sale(&sale).unwrap();
        assert_eq!(validated.status, SaleStatus::Pending);
        assert_eq!(validated.line_subtotals, vec![Money::from_cents(30_000), Money::from_cents(4_500)]);
        assert_eq!(validated.totals.subtotal.cents(), 34_500);
        assert_eq!(validated.totals.total.cents(), 33_700);
    }

    #[test]
    fn test_huge_tax_rejected_without_panic() {
        let mut sale = sale_with(vec![item(VARIANT_A, 1, 100, 0)]);
        sale.tax_cents = i64::MAX;

        let err = validate_new_sale(&sale).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_empty_sale() {
        assert_eq!(validate_new_sale(&sale_with(vec![])).unwrap_err(), CoreError::EmptySale);
    }

    #[test]
    fn test_line_shape_errors() {
        let cases = vec![
            item(VARIANT_A, 0, 100, 0),
            item(VARIANT_A, 1_000, 100, 0),
            item(VARIANT_A, 1, 0, 0),
            item(VARIANT_A, 1, 100, -1),
            item(VARIANT_A, 1, 100, 101),
            item("not-a-uuid", 1, 100, 0),
        ];
        for case in cases {
            let err = validate_new_sale(&sale_with(vec![case])).unwrap_err();
            assert_eq!(err.code(), "INVALID_LINE_ITEM");
        }
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let err = validate_new_sale(&sale_with(vec![item(VARIANT_A, 1, 100, 0), item(VARIANT_A, 2, 100, 0)]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLineItem { index: 1, .. }));
    }

    #[test]
    fn test_header_amounts() {
        let mut sale = sale_with(vec![item(VARIANT_A, 1, 100, 0)]);
        sale.discount_cents = 500;
        assert_eq!(validate_new_sale(&sale).unwrap_err().code(), "VALIDATION_ERROR");

        let mut sale = sale_with(vec![item(VARIANT_A, 1, 100, 0)]);
        sale.tax_cents = -1;
        assert_eq!(validate_new_sale(&sale).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_initial_status_must_be_open() {
        let mut sale = sale_with(vec![item(VARIANT_A, 1, 100, 0)]);
        sale.status = Some(SaleStatus::Returned);
        assert_eq!(validate_new_sale(&sale).unwrap_err().code(), "INVALID_STATUS_TRANSITION");
    }

    #[test]
    fn test_new_return_shape() {
        let mut ret = NewReturn {
            sale_id: CUSTOMER.to_string(),
            return_date: None,
            reason: ReturnReason::WrongSize,
            description: None,
            refunded_cents: None,
            processed_by: None,
            items: vec![],
        };
        assert_eq!(validate_new_return(&ret).unwrap_err(), CoreError::EmptyReturn);

        ret.items.push(NewReturnItem {
            sale_item_id: VARIANT_A.to_string(),
            quantity: 1,
            refund_cents: 100,
        });
        assert!(validate_new_return(&ret).is_ok());

        ret.refunded_cents = Some(-5);
        assert_eq!(validate_new_return(&ret).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_field_validators() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_stock_value(0).is_ok());
        assert!(validate_stock_value(-1).is_err());
        assert!(validate_catalog_prices(0, 100).is_ok());
        assert!(validate_catalog_prices(0, 0).is_err());
        assert!(validate_optional_text("notes", Some(&"x".repeat(1001)), MAX_TEXT_LEN).is_err());
        assert!(validate_uuid("id", "").is_err());
    }
}

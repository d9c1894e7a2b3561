//! # Domain Types
//!
//! Entities and input payloads of the back-office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Garment ──< Variant (garment × size × color, stock ≥ 0)               │
//! │                 ▲                                                       │
//! │                 │ restricted                                            │
//! │  Customer ──< Sale ──< SaleItem (variant, qty, unit price, discount)   │
//! │                 ▲          ▲                                            │
//! │                 │          │ restricted                                 │
//! │           SaleReturn ──< ReturnItem (sale item, qty, refund)           │
//! │                                                                         │
//! │  ──<  owns (cascade delete)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is identified by a UUID v4 `id`. Sales additionally carry a
//! human-readable sequential `number`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Customers
// =============================================================================

/// Identity document kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Dni,
    Cuit,
    Passport,
    Other,
}

/// A customer of the shop.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub document_type: DocumentType,
    pub document_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Deactivated customers keep their history but cannot buy.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Size {
    pub id: String,
    pub name: String,
    /// Display order ("0-3 months" before "3-6 months").
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Color {
    pub id: String,
    pub name: String,
    pub hex_code: Option<String>,
}

/// A garment in the catalog. Stock lives on its variants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Garment {
    pub id: String,
    /// Short business code, unique.
    pub code: String,
    pub name: String,
    pub category_id: String,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Garment {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

/// A purchasable (garment, size, color) combination with its own stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub garment_id: String,
    pub size_id: String,
    pub color_id: String,
    /// Units on hand. Never negative.
    pub stock: i64,
    pub barcode: Option<String>,
    /// Inactive variants cannot be sold; they replace deletion once referenced.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Stock that can be sold right now. Inactive variants have none.
    #[inline]
    pub fn sellable_stock(&self) -> i64 {
        if self.is_active {
            self.stock
        } else {
            0
        }
    }

    /// True when the variant is active and has at least one unit.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.sellable_stock() > 0
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle of a sale.
///
/// ```text
/// pending ──► paid ──► returned (terminal)
///    │
///    └──────► cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    Paid,
    Cancelled,
    /// At least one return was recorded against the sale.
    Returned,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(SaleStatus::Pending),
            "paid" => Ok(SaleStatus::Paid),
            "cancelled" => Ok(SaleStatus::Cancelled),
            "returned" => Ok(SaleStatus::Returned),
            _ => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: "must be one of pending, paid, cancelled, returned".to_string(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    MercadoPago,
    Other,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header. Totals are always derived from the persisted lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Zero-padded sequential number, e.g. "00000042".
    pub number: String,
    pub customer_id: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Name of the person who made the sale.
    pub seller: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub item_discount_cents: i64,
    /// quantity × unit price − item discount
    pub subtotal_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn item_discount(&self) -> Money {
        Money::from_cents(self.item_discount_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Sale header together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl SaleDetail {
    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    Defect,
    WrongSize,
    WrongColor,
    ChangedMind,
    Other,
}

/// Return header, always attached to a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    #[ts(as = "String")]
    pub return_date: DateTime<Utc>,
    pub reason: ReturnReason,
    pub description: Option<String>,
    pub refunded_cents: i64,
    pub processed_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleReturn {
    #[inline]
    pub fn refunded(&self) -> Money {
        Money::from_cents(self.refunded_cents)
    }
}

/// A line of a return, pointing at the sale line it reverses.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub sale_item_id: String,
    pub quantity: i64,
    pub refund_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnDetail {
    #[serde(rename = "return")]
    pub sale_return: SaleReturn,
    pub items: Vec<ReturnItem>,
}

// =============================================================================
// Input Payloads
// =============================================================================

/// Payload for `create_sale`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub customer_id: String,
    /// Defaults to now.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    /// Initial status; `pending` or `paid`. Defaults to `pending`.
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub item_discount_cents: i64,
}

/// Partial update of a sale line. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemChanges {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub item_discount_cents: Option<i64>,
}

impl SaleItemChanges {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit_price_cents.is_none()
            && self.item_discount_cents.is_none()
    }
}

/// Header fields that can change without affecting totals or status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetailsUpdate {
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
}

/// Payload for `create_return`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReturn {
    pub sale_id: String,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub return_date: Option<DateTime<Utc>>,
    pub reason: ReturnReason,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the sum of the line refunds.
    #[serde(default)]
    pub refunded_cents: Option<i64>,
    #[serde(default)]
    pub processed_by: Option<String>,
    pub items: Vec<NewReturnItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReturnItem {
    pub sale_item_id: String,
    pub quantity: i64,
    pub refund_cents: i64,
}

/// Filter for listing sales.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub customer_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub limit: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(stock: i64, is_active: bool) -> Variant {
        let now = Utc::now();
        Variant {
            id: "v".to_string(),
            garment_id: "g".to_string(),
            size_id: "s".to_string(),
            color_id: "c".to_string(),
            stock,
            barcode: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
    }

    #[test]
    fn test_sale_status_parse() {
        assert_eq!("PAID".parse::<SaleStatus>().unwrap(), SaleStatus::Paid);
        assert_eq!(" returned ".parse::<SaleStatus>().unwrap(), SaleStatus::Returned);
        assert!("shipped".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn test_sale_status_serde() {
        let json = serde_json::to_string(&SaleStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let method: PaymentMethod = serde_json::from_str("\"mercado_pago\"").unwrap();
        assert_eq!(method, PaymentMethod::MercadoPago);
    }

    #[test]
    fn test_inactive_variant_has_no_sellable_stock() {
        assert_eq!(variant(5, true).sellable_stock(), 5);
        assert_eq!(variant(5, false).sellable_stock(), 0);
        assert!(!variant(0, true).is_available());
    }

    #[test]
    fn test_new_sale_defaults_from_json() {
        let sale: NewSale = serde_json::from_str(
            r#"{"customer_id":"c-1","items":[{"variant_id":"v-1","quantity":2,"unit_price_cents":500}]}"#,
        )
        .unwrap();
        assert_eq!(sale.discount_cents, 0);
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert!(sale.status.is_none());
        assert_eq!(sale.items[0].item_discount_cents, 0);
    }
}

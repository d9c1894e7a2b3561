//! # Variant Stock Ledger
//!
//! The only code that writes `variants.stock`.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  reserve(v, q)   UPDATE … SET stock = stock − q                         │
//! │                  WHERE id = v AND is_active = 1 AND stock >= q          │
//! │                  0 rows ─► INSUFFICIENT_STOCK (re-read available)       │
//! │                                                                         │
//! │  adjust(v, d)    stock = max(0, stock + d), saturating                  │
//! │                  never fails for over-subtraction, logs a warning       │
//! │                                                                         │
//! │  restore(v, q)   adjust(v, +q)                                          │
//! │                                                                         │
//! │  set_stock(v, n) absolute value, n ≥ 0                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions run on a caller-supplied connection so they join the
//! caller's transaction (`&mut *tx`). [`StockLedger`] wraps them for
//! standalone use.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use atelier_core::ledger::{self, StockAdjustment};
use atelier_core::validation::validate_stock_value;
use atelier_core::CoreError;

// =============================================================================
// Ledger Statements
// =============================================================================

/// Takes `quantity` units from an active variant, failing when not enough are
/// available. Returns the new stock.
pub async fn reserve(conn: &mut SqliteConnection, variant_id: &str, quantity: i64) -> DbResult<i64> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE variants
        SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND is_active = 1 AND stock >= ?1
        RETURNING stock
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = new_stock {
        debug!(variant_id = %variant_id, quantity = quantity, stock = stock, "Reserved stock");
        return Ok(stock);
    }

    let row: Option<(i64, bool)> =
        sqlx::query_as("SELECT stock, is_active FROM variants WHERE id = ?1")
            .bind(variant_id)
            .fetch_optional(&mut *conn)
            .await?;

    let (stock, is_active) =
        row.ok_or_else(|| CoreError::VariantNotFound(variant_id.to_string()))?;

    ledger::check_reservation(variant_id, stock, is_active, quantity)?;

    // The conditional update failed while the re-read says it should pass:
    // only possible if the row changed between the two statements.
    Err(DbError::TransactionFailed(format!(
        "stock of variant {} changed during reservation",
        variant_id
    )))
}

/// Adds `delta` (possibly negative) to the stock, flooring at zero.
pub async fn adjust(
    conn: &mut SqliteConnection,
    variant_id: &str,
    delta: i64,
) -> DbResult<StockAdjustment> {
    let now = Utc::now();

    // Touch first: takes the write lock and reads the previous value.
    let previous: i64 = sqlx::query_scalar(
        "UPDATE variants SET updated_at = ?1 WHERE id = ?2 RETURNING stock",
    )
    .bind(now)
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::VariantNotFound(variant_id.to_string()))?;

    // Saturating arithmetic stays in Rust: SQLite turns an overflowing
    // integer sum into a REAL.
    let adjustment = ledger::adjust(previous, delta);
    let new_stock = adjustment.new_stock;

    sqlx::query("UPDATE variants SET stock = ?1 WHERE id = ?2")
        .bind(new_stock)
        .bind(variant_id)
        .execute(&mut *conn)
        .await?;

    if adjustment.clamped() {
        warn!(
            variant_id = %variant_id,
            previous = previous,
            delta = delta,
            "Stock adjustment clamped at zero"
        );
    } else {
        debug!(variant_id = %variant_id, delta = delta, stock = new_stock, "Adjusted stock");
    }

    Ok(adjustment)
}

/// Puts `quantity` units back. Returns the new stock.
pub async fn restore(conn: &mut SqliteConnection, variant_id: &str, quantity: i64) -> DbResult<i64> {
    Ok(adjust(conn, variant_id, quantity).await?.new_stock)
}

/// Sets an absolute stock value.
pub async fn set_stock(conn: &mut SqliteConnection, variant_id: &str, stock: i64) -> DbResult<()> {
    validate_stock_value(stock)?;

    let result = sqlx::query("UPDATE variants SET stock = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(stock)
        .bind(Utc::now())
        .bind(variant_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::VariantNotFound(variant_id.to_string()).into());
    }

    debug!(variant_id = %variant_id, stock = stock, "Set stock");
    Ok(())
}

pub async fn current_stock(conn: &mut SqliteConnection, variant_id: &str) -> DbResult<i64> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM variants WHERE id = ?1")
        .bind(variant_id)
        .fetch_optional(&mut *conn)
        .await?;

    stock.ok_or_else(|| CoreError::VariantNotFound(variant_id.to_string()).into())
}

// =============================================================================
// Standalone Ledger
// =============================================================================

/// Stock operations outside of a sale or return.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Manual stock correction with clamp-at-zero semantics.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // 3 units found damaged
    /// let adj = db.stock().adjust_stock(&variant_id, -3).await?;
    /// println!("stock now {}", adj.new_stock);
    /// ```
    pub async fn adjust_stock(&self, variant_id: &str, delta: i64) -> DbResult<StockAdjustment> {
        let mut tx = self.pool.begin().await?;
        let adjustment = adjust(&mut tx, variant_id, delta).await?;
        tx.commit().await?;

        info!(
            variant_id = %variant_id,
            delta = delta,
            stock = adjustment.new_stock,
            "Stock adjusted"
        );
        Ok(adjustment)
    }

    /// Sets an absolute stock value (stock count after an inventory check).
    pub async fn set_stock(&self, variant_id: &str, stock: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_stock(&mut conn, variant_id, stock).await
    }

    pub async fn get_stock(&self, variant_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        current_stock(&mut conn, variant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_adjust_clamps_at_zero() {
        let fx = Fixture::new().await;
        let ledger = fx.db.stock();

        let adj = ledger.adjust_stock(&fx.variant_a.id, -4).await.unwrap();
        assert_eq!(adj.new_stock, 6);
        assert!(!adj.clamped());

        let adj = ledger.adjust_stock(&fx.variant_a.id, -100).await.unwrap();
        assert_eq!(adj.previous, 6);
        assert_eq!(adj.new_stock, 0);
        assert!(adj.clamped());

        assert_eq!(ledger.get_stock(&fx.variant_a.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_saturates_on_huge_delta() {
        let fx = Fixture::new().await;
        let ledger = fx.db.stock();

        let adj = ledger.adjust_stock(&fx.variant_a.id, i64::MAX).await.unwrap();
        assert_eq!(adj.previous, 10);
        assert_eq!(adj.new_stock, i64::MAX);
        assert!(!adj.clamped());
        assert_eq!(ledger.get_stock(&fx.variant_a.id).await.unwrap(), i64::MAX);

        let adj = ledger.adjust_stock(&fx.variant_a.id, i64::MIN).await.unwrap();
        assert_eq!(adj.new_stock, 0);
        assert!(adj.clamped());
    }

    #[tokio::test]
    async fn test_adjust_unknown_variant() {
        let fx = Fixture::new().await;
        let err = fx.db.stock().adjust_stock("missing", 1).await.unwrap_err();
        assert_eq!(err.code(), "VARIANT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reserve_is_conditional() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        assert_eq!(reserve(&mut conn, &fx.variant_a.id, 4).await.unwrap(), 6);

        let err = reserve(&mut conn, &fx.variant_a.id, 7).await.unwrap_err();
        assert_eq!(
            err.as_business(),
            Some(&CoreError::InsufficientStock {
                variant_id: fx.variant_a.id.clone(),
                available: 6,
                requested: 7,
            })
        );
        assert_eq!(current_stock(&mut conn, &fx.variant_a.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_reserve_inactive_variant_reports_zero() {
        let fx = Fixture::new().await;
        fx.db.catalog().set_variant_active(&fx.variant_a.id, false).await.unwrap();

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let err = reserve(&mut conn, &fx.variant_a.id, 1).await.unwrap_err();
        assert!(matches!(
            err.as_business(),
            Some(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_set_stock_rejects_negative() {
        let fx = Fixture::new().await;
        let ledger = fx.db.stock();

        ledger.set_stock(&fx.variant_b.id, 42).await.unwrap();
        assert_eq!(ledger.get_stock(&fx.variant_b.id).await.unwrap(), 42);

        let err = ledger.set_stock(&fx.variant_b.id, -1).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}

//! # Return Repository
//!
//! Returns against paid sales. Returned units go back to stock.
//!
//! ## create_return
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      create_return (one transaction)                    │
//! │                                                                         │
//! │  0. validate payload shape                  (no transaction yet)       │
//! │  1. lock the sale                           ← concurrent returns wait  │
//! │  2. sale is paid or returned                                           │
//! │  3. load sold / already-returned per line, plan (OVER_RETURN, ...)     │
//! │  4. first return? sale.status = returned                               │
//! │  5. insert header (refund defaults to Σ line refunds)                  │
//! │  6. per line: stock += quantity, insert line                           │
//! │  7. commit                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting return lines takes the units back out of stock with the
//! clamping ledger adjustment. The sale stays `returned`.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::sale::{fetch_sale_item, lock_sale};
use crate::repository::stock;
use atelier_core::returns::{plan_return, ReturnableLine};
use atelier_core::status::{check_transition, is_returnable, StatusChange, StatusChangeMode};
use atelier_core::validation::validate_new_return;
use atelier_core::{CoreError, NewReturn, ReturnDetail, ReturnItem, SaleReturn, SaleStatus};

const RETURN_COLUMNS: &str = r#"
    id, sale_id, return_date, reason, description, refunded_cents, processed_by, created_at
"#;

const RETURN_ITEM_COLUMNS: &str = "id, return_id, sale_item_id, quantity, refund_cents";

/// Repository for return database operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Records a return and puts the returned units back in stock.
    ///
    /// ## Errors
    /// - `SALE_NOT_FOUND`, `SALE_NOT_RETURNABLE`
    /// - `EMPTY_RETURN`, `INVALID_LINE_ITEM`
    /// - `SALE_ITEM_NOT_FOUND`, `ITEM_NOT_IN_SALE`
    /// - `OVER_RETURN` with the quantity still returnable
    pub async fn create_return(&self, new_return: &NewReturn) -> DbResult<ReturnDetail> {
        validate_new_return(new_return)?;

        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut tx, &new_return.sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(new_return.sale_id.clone()))?;

        if !is_returnable(sale.status) {
            return Err(CoreError::SaleNotReturnable {
                sale_id: sale.id,
                status: sale.status.to_string(),
            }
            .into());
        }

        let mut known = HashMap::new();
        for item in &new_return.items {
            if known.contains_key(&item.sale_item_id) {
                continue;
            }
            if let Some(sale_item) = fetch_sale_item(&mut tx, &item.sale_item_id).await? {
                let already_returned = returned_quantity_in(&mut tx, &sale_item.id).await?;
                known.insert(
                    sale_item.id.clone(),
                    ReturnableLine {
                        sale_item_id: sale_item.id,
                        sale_id: sale_item.sale_id,
                        variant_id: sale_item.variant_id,
                        sold: sale_item.quantity,
                        already_returned,
                    },
                );
            }
        }

        let plan = plan_return(&sale.id, &new_return.items, &known)?;

        if let StatusChange::Changed { from, to } =
            check_transition(&sale.id, sale.status, SaleStatus::Returned, StatusChangeMode::Normal)?
        {
            sqlx::query("UPDATE sales SET status = ?1 WHERE id = ?2")
                .bind(to)
                .bind(&sale.id)
                .execute(&mut *tx)
                .await?;
            info!(sale_id = %sale.id, from = %from, to = %to, "Sale marked as returned");
        }

        let now = Utc::now();
        let sale_return = SaleReturn {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            return_date: new_return.return_date.unwrap_or(now),
            reason: new_return.reason,
            description: new_return.description.clone(),
            refunded_cents: new_return
                .refunded_cents
                .unwrap_or_else(|| plan.refund_total.cents()),
            processed_by: new_return.processed_by.clone(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, sale_id, return_date, reason, description,
                refunded_cents, processed_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale_return.id)
        .bind(&sale_return.sale_id)
        .bind(sale_return.return_date)
        .bind(sale_return.reason)
        .bind(&sale_return.description)
        .bind(sale_return.refunded_cents)
        .bind(&sale_return.processed_by)
        .bind(sale_return.created_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            stock::restore(&mut tx, &line.variant_id, line.quantity).await?;

            let item = ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: sale_return.id.clone(),
                sale_item_id: line.sale_item_id.clone(),
                quantity: line.quantity,
                refund_cents: line.refund.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO return_items (id, return_id, sale_item_id, quantity, refund_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.sale_item_id)
            .bind(item.quantity)
            .bind(item.refund_cents)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            return_id = %sale_return.id,
            sale_id = %sale.id,
            lines = items.len(),
            refunded = %sale_return.refunded(),
            "Return created"
        );

        Ok(ReturnDetail {
            sale_return,
            items,
        })
    }

    /// Deletes one return line and takes its units back out of stock.
    pub async fn delete_return_item(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let (sale_item_id, quantity): (String, i64) = sqlx::query_as(
            "DELETE FROM return_items WHERE id = ?1 RETURNING sale_item_id, quantity",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::ReturnItemNotFound(id.to_string()))?;

        let sale_item = fetch_sale_item(&mut tx, &sale_item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(sale_item_id.clone()))?;

        let adjustment = stock::adjust(&mut tx, &sale_item.variant_id, -quantity).await?;
        tx.commit().await?;

        info!(
            return_item_id = %id,
            variant_id = %sale_item.variant_id,
            stock = adjustment.new_stock,
            "Return item deleted"
        );
        Ok(())
    }

    /// Deletes a return with all its lines, reversing each line's stock.
    pub async fn delete_return(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // Writing the sale row first serializes this with new returns.
        let sale_id: String = sqlx::query_scalar(
            r#"
            UPDATE sales SET updated_at = ?1
            WHERE id = (SELECT sale_id FROM returns WHERE id = ?2)
            RETURNING id
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::ReturnNotFound(id.to_string()))?;

        let lines: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT si.variant_id, ri.quantity
            FROM return_items ri
            JOIN sale_items si ON si.id = ri.sale_item_id
            WHERE ri.return_id = ?1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for (variant_id, quantity) in &lines {
            stock::adjust(&mut tx, variant_id, -quantity).await?;
        }

        sqlx::query("DELETE FROM returns WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(return_id = %id, sale_id = %sale_id, lines = lines.len(), "Return deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_return(&self, id: &str) -> DbResult<Option<SaleReturn>> {
        let sql = format!("SELECT {} FROM returns WHERE id = ?1", RETURN_COLUMNS);
        let sale_return = sqlx::query_as::<_, SaleReturn>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale_return)
    }

    pub async fn get_return_detail(&self, id: &str) -> DbResult<Option<ReturnDetail>> {
        let Some(sale_return) = self.get_return(id).await? else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM return_items WHERE return_id = ?1 ORDER BY rowid",
            RETURN_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, ReturnItem>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(ReturnDetail { sale_return, items }))
    }

    /// Returns of a sale, oldest first.
    pub async fn list_returns_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleReturn>> {
        let sql = format!(
            "SELECT {} FROM returns WHERE sale_id = ?1 ORDER BY return_date, rowid",
            RETURN_COLUMNS
        );
        let returns = sqlx::query_as::<_, SaleReturn>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(returns)
    }

    /// Units of a sale line returned so far, across all returns.
    pub async fn returned_quantity(&self, sale_item_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        returned_quantity_in(&mut conn, sale_item_id).await
    }
}

pub(crate) async fn returned_quantity_in(
    conn: &mut SqliteConnection,
    sale_item_id: &str,
) -> DbResult<i64> {
    let returned: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM return_items WHERE sale_item_id = ?1",
    )
    .bind(sale_item_id)
    .fetch_one(&mut *conn)
    .await?;

    debug!(sale_item_id = %sale_item_id, returned = returned, "Returned quantity");
    Ok(returned)
}

//! # Sale Repository
//!
//! Sales and their lines. Every mutating operation is one transaction that
//! keeps stock, line subtotals and header totals consistent.
//!
//! ## create_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_sale (one transaction)                     │
//! │                                                                         │
//! │  0. validate payload, price lines           (no transaction yet)       │
//! │  1. allocate sale number                    ← takes the write lock     │
//! │  2. customer exists and is active                                      │
//! │  3. insert header with provisional totals                              │
//! │  4. per line: reserve stock (conditional)   ─┐ any failure:            │
//! │               insert line                    │ rollback, nothing       │
//! │  5. recompute totals from persisted lines   ─┘ persisted               │
//! │  6. commit                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Line Maintenance
//! `update_sale_item`, `delete_sale_item` and `delete_sale` first lock the
//! sale (a write on its row), then move stock through the ledger and
//! recompute the header. Lines can only change while the sale is `pending`
//! or `paid`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::customer::fetch_customer;
use crate::repository::{sequence, stock};
use atelier_core::pricing::{reprice_line, verify_totals, SaleTotals, TotalsCheck};
use atelier_core::sale_number::normalize_sale_number;
use atelier_core::status::{check_line_maintenance, check_transition, StatusChange, StatusChangeMode};
use atelier_core::validation::{validate_new_sale, validate_optional_text, MAX_TEXT_LEN};
use atelier_core::{
    CoreError, Money, NewSale, Sale, SaleDetail, SaleDetailsUpdate, SaleFilter, SaleItem,
    SaleItemChanges, SaleStatus,
};

const SALE_COLUMNS: &str = r#"
    id, number, customer_id, sale_date, subtotal_cents, discount_cents, tax_cents,
    total_cents, status, payment_method, notes, seller, created_at, updated_at
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, variant_id, quantity, unit_price_cents, item_discount_cents, subtotal_cents
"#;

const DEFAULT_LIST_LIMIT: u32 = 100;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a sale with its lines, reserving stock for each line.
    ///
    /// ## Errors
    /// - `CUSTOMER_NOT_FOUND` / `CUSTOMER_INACTIVE`
    /// - `EMPTY_SALE`, `INVALID_LINE_ITEM`, `VALIDATION_ERROR`
    /// - `VARIANT_NOT_FOUND`, `INSUFFICIENT_STOCK`
    /// - `INVALID_STATUS_TRANSITION` for an initial status other than
    ///   pending or paid
    pub async fn create_sale(&self, new_sale: &NewSale) -> DbResult<SaleDetail> {
        let validated = validate_new_sale(new_sale)?;

        let mut tx = self.pool.begin().await?;

        let number = sequence::next_sale_number(&mut tx).await?;

        let customer = fetch_customer(&mut tx, &new_sale.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(new_sale.customer_id.clone()))?;
        if !customer.is_active {
            return Err(CoreError::CustomerInactive {
                customer_id: customer.id,
            }
            .into());
        }

        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();

        debug!(sale_id = %sale_id, number = %number, lines = new_sale.items.len(), "Creating sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, number, customer_id, sale_date,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                status, payment_method, notes, seller, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
        )
        .bind(&sale_id)
        .bind(&number)
        .bind(&customer.id)
        .bind(new_sale.sale_date.unwrap_or(now))
        .bind(validated.totals.subtotal.cents())
        .bind(validated.totals.discount.cents())
        .bind(validated.totals.tax.cents())
        .bind(validated.totals.total.cents())
        .bind(validated.status)
        .bind(new_sale.payment_method)
        .bind(&new_sale.notes)
        .bind(&new_sale.seller)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (item, subtotal) in new_sale.items.iter().zip(&validated.line_subtotals) {
            stock::reserve(&mut tx, &item.variant_id, item.quantity).await?;

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, variant_id, quantity,
                    unit_price_cents, item_discount_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&item.variant_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.item_discount_cents)
            .bind(subtotal.cents())
            .execute(&mut *tx)
            .await?;
        }

        let totals = recompute_totals(&mut tx, &sale_id).await?;
        debug_assert_eq!(totals, validated.totals);

        let detail = fetch_sale_detail(&mut tx, &sale_id)
            .await?
            .ok_or_else(|| DbError::TransactionFailed(format!("sale {} vanished", sale_id)))?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            number = %number,
            total = %totals.total,
            status = %validated.status,
            "Sale created"
        );

        Ok(detail)
    }

    // =========================================================================
    // Line Maintenance
    // =========================================================================

    /// Changes quantity, unit price or discount of a line.
    ///
    /// A larger quantity reserves the difference; a smaller one restores it.
    pub async fn update_sale_item(
        &self,
        item_id: &str,
        changes: &SaleItemChanges,
    ) -> DbResult<SaleItem> {
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale_for_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()))?;
        check_line_maintenance(&sale.id, sale.status)?;

        let item = fetch_sale_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()))?;

        let quantity = changes.quantity.unwrap_or(item.quantity);
        let unit_price = changes.unit_price_cents.unwrap_or(item.unit_price_cents);
        let discount = changes.item_discount_cents.unwrap_or(item.item_discount_cents);

        let subtotal = reprice_line(
            item_id,
            quantity,
            Money::from_cents(unit_price),
            Money::from_cents(discount),
        )?;

        let delta = quantity - item.quantity;
        if delta > 0 {
            stock::reserve(&mut tx, &item.variant_id, delta).await?;
        } else if delta < 0 {
            stock::restore(&mut tx, &item.variant_id, -delta).await?;
        }

        sqlx::query(
            r#"
            UPDATE sale_items SET
                quantity = ?1,
                unit_price_cents = ?2,
                item_discount_cents = ?3,
                subtotal_cents = ?4
            WHERE id = ?5
            "#,
        )
        .bind(quantity)
        .bind(unit_price)
        .bind(discount)
        .bind(subtotal.cents())
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        let totals = recompute_totals(&mut tx, &sale.id).await?;

        let updated = fetch_sale_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()))?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            item_id = %item_id,
            quantity_delta = delta,
            total = %totals.total,
            "Sale item updated"
        );

        Ok(updated)
    }

    /// Removes a line, restoring its quantity to stock.
    ///
    /// A sale keeps at least one line; delete the sale instead.
    pub async fn delete_sale_item(&self, item_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale_for_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()))?;
        check_line_maintenance(&sale.id, sale.status)?;

        let item = fetch_sale_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()))?;

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM return_items WHERE sale_item_id = ?1")
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?;
        if referenced > 0 {
            return Err(CoreError::RecordReferenced {
                entity: "SaleItem".to_string(),
                id: item_id.to_string(),
                referenced_by: format!("{} return item(s)", referenced),
            }
            .into());
        }

        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = ?1")
            .bind(&sale.id)
            .fetch_one(&mut *tx)
            .await?;
        if lines <= 1 {
            return Err(CoreError::EmptySale.into());
        }

        stock::restore(&mut tx, &item.variant_id, item.quantity).await?;

        sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        let totals = recompute_totals(&mut tx, &sale.id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            item_id = %item_id,
            restored = item.quantity,
            total = %totals.total,
            "Sale item deleted"
        );
        Ok(())
    }

    /// Deletes a sale without returns, restoring stock for every line.
    pub async fn delete_sale(&self, sale_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let returns: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM returns WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(&mut *tx)
            .await?;
        if returns > 0 {
            return Err(CoreError::RecordReferenced {
                entity: "Sale".to_string(),
                id: sale_id.to_string(),
                referenced_by: format!("{} return(s)", returns),
            }
            .into());
        }

        let items = fetch_sale_items(&mut tx, sale_id).await?;
        for item in &items {
            stock::restore(&mut tx, &item.variant_id, item.quantity).await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, number = %sale.number, lines = items.len(), "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Status & Header
    // =========================================================================

    /// Moves a sale forward along its lifecycle.
    pub async fn update_sale_status(&self, sale_id: &str, status: SaleStatus) -> DbResult<Sale> {
        self.set_status(sale_id, status, StatusChangeMode::Normal).await
    }

    /// Back-office correction: any status, except leaving `returned`.
    pub async fn admin_set_status(&self, sale_id: &str, status: SaleStatus) -> DbResult<Sale> {
        self.set_status(sale_id, status, StatusChangeMode::Administrative)
            .await
    }

    async fn set_status(
        &self,
        sale_id: &str,
        status: SaleStatus,
        mode: StatusChangeMode,
    ) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let updated = match check_transition(&sale.id, sale.status, status, mode)? {
            StatusChange::Unchanged => sale,
            StatusChange::Changed { from, to } => {
                let sql = format!(
                    "UPDATE sales SET status = ?1 WHERE id = ?2 RETURNING {}",
                    SALE_COLUMNS
                );
                let updated = sqlx::query_as::<_, Sale>(&sql)
                    .bind(to)
                    .bind(sale_id)
                    .fetch_one(&mut *tx)
                    .await?;

                info!(sale_id = %sale_id, from = %from, to = %to, mode = ?mode, "Sale status changed");
                updated
            }
        };

        tx.commit().await?;
        Ok(updated)
    }

    /// Changes payment method, notes or seller. Status and totals are untouched.
    pub async fn update_sale_details(
        &self,
        sale_id: &str,
        details: &SaleDetailsUpdate,
    ) -> DbResult<Sale> {
        validate_optional_text("notes", details.notes.as_deref(), MAX_TEXT_LEN)?;
        validate_optional_text("seller", details.seller.as_deref(), 100)?;

        let sql = format!(
            r#"
            UPDATE sales SET
                payment_method = COALESCE(?1, payment_method),
                notes = COALESCE(?2, notes),
                seller = COALESCE(?3, seller),
                updated_at = ?4
            WHERE id = ?5
            RETURNING {}
            "#,
            SALE_COLUMNS
        );

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(details.payment_method)
            .bind(&details.notes)
            .bind(&details.seller)
            .bind(Utc::now())
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        debug!(sale_id = %sale_id, "Sale details updated");
        Ok(sale)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Looks a sale up by number; "42" and "00000042" are the same sale.
    pub async fn get_sale_by_number(&self, number: &str) -> DbResult<Option<Sale>> {
        let Some(number) = normalize_sale_number(number) else {
            return Ok(None);
        };

        let sql = format!("SELECT {} FROM sales WHERE number = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn get_sale_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale_detail(&mut conn, id).await
    }

    pub async fn list_sale_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale_items(&mut conn, sale_id).await
    }

    /// Most recent sales first.
    pub async fn list_sales(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM sales
            WHERE (?1 IS NULL OR customer_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY sale_date DESC, number DESC
            LIMIT ?3
            "#,
            SALE_COLUMNS
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(&filter.customer_id)
            .bind(filter.status)
            .bind(i64::from(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)))
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Re-derives totals from the persisted lines and reports drift.
    pub async fn verify_sale_totals(&self, sale_id: &str) -> DbResult<TotalsCheck> {
        let mut conn = self.pool.acquire().await?;

        let sale = fetch_sale(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let items = fetch_sale_items(&mut conn, sale_id).await?;

        let check = verify_totals(&sale, &items);
        if !check.is_consistent() {
            debug!(sale_id = %sale_id, drifted = check.drifted_lines.len(), "Sale totals drifted");
        }
        Ok(check)
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

/// Writes the sale row (taking the database write lock) and returns it.
pub(crate) async fn lock_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Sale>> {
    let sql = format!(
        "UPDATE sales SET updated_at = ?1 WHERE id = ?2 RETURNING {}",
        SALE_COLUMNS
    );
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(Utc::now())
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

/// Like [`lock_sale`], for the sale owning line `item_id`.
pub(crate) async fn lock_sale_for_item(
    conn: &mut SqliteConnection,
    item_id: &str,
) -> DbResult<Option<Sale>> {
    let sql = format!(
        r#"
        UPDATE sales SET updated_at = ?1
        WHERE id = (SELECT sale_id FROM sale_items WHERE id = ?2)
        RETURNING {}
        "#,
        SALE_COLUMNS
    );
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(Utc::now())
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

pub(crate) async fn fetch_sale_item(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<SaleItem>> {
    let sql = format!("SELECT {} FROM sale_items WHERE id = ?1", SALE_ITEM_COLUMNS);
    let item = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Lines in insertion order.
pub(crate) async fn fetch_sale_items(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let sql = format!(
        "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid",
        SALE_ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn fetch_sale_detail(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SaleDetail>> {
    let Some(sale) = fetch_sale(conn, id).await? else {
        return Ok(None);
    };
    let items = fetch_sale_items(conn, id).await?;
    Ok(Some(SaleDetail { sale, items }))
}

/// Recomputes `subtotal` and `total` of a sale from its persisted lines.
///
/// Fails with a validation error when the stored discount exceeds the new
/// subtotal plus tax.
pub(crate) async fn recompute_totals(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<SaleTotals> {
    let (discount, tax): (i64, i64) =
        sqlx::query_as("SELECT discount_cents, tax_cents FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

    let subtotal: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(subtotal_cents), 0) FROM sale_items WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    let totals = SaleTotals::compute(
        [Money::from_cents(subtotal)],
        Money::from_cents(discount),
        Money::from_cents(tax),
    )?;

    sqlx::query("UPDATE sales SET subtotal_cents = ?1, total_cents = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(totals.subtotal.cents())
        .bind(totals.total.cents())
        .bind(Utc::now())
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    debug!(sale_id = %sale_id, subtotal = %totals.subtotal, total = %totals.total, "Recomputed totals");
    Ok(totals)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::test_support::{line, Fixture};
    use atelier_core::{PaymentMethod, MAX_ITEM_QUANTITY};

    #[tokio::test]
    async fn test_create_sale_prices_and_reserves() {
        let fx = Fixture::new().await;

        let mut new_sale = fx.new_sale(vec![
            line(&fx.variant_a.id, 3, 10_000),
            line(&fx.variant_b.id, 1, 5_000),
        ]);
        new_sale.items[1].item_discount_cents = 500;
        new_sale.discount_cents = 1_000;
        new_sale.tax_cents = 200;

        let detail = fx.db.sales().create_sale(&new_sale).await.unwrap();

        assert_eq!(detail.sale.number, "00000001");
        assert_eq!(detail.sale.status, SaleStatus::Pending);
        assert_eq!(detail.sale.subtotal_cents, 34_500);
        assert_eq!(detail.sale.total_cents, 33_700);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].subtotal_cents, 30_000);
        assert_eq!(detail.items[1].subtotal_cents, 4_500);
        assert_eq!(detail.item_count(), 4);

        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 7);
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 4);

        let second = fx.sell(&fx.variant_a.id, 1, 10_000).await;
        assert_eq!(second.sale.number, "00000002");
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let fx = Fixture::new().await;

        let new_sale = fx.new_sale(vec![
            line(&fx.variant_a.id, 2, 10_000),
            line(&fx.variant_b.id, 6, 5_000),
        ]);
        let err = fx.db.sales().create_sale(&new_sale).await.unwrap_err();

        assert_eq!(
            err.as_business(),
            Some(&CoreError::InsufficientStock {
                variant_id: fx.variant_b.id.clone(),
                available: 5,
                requested: 6,
            })
        );
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 10);
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 5);
        assert!(fx.db.sales().list_sales(&SaleFilter::default()).await.unwrap().is_empty());

        // The sale number was rolled back with the rest
        let detail = fx.sell(&fx.variant_a.id, 1, 10_000).await;
        assert_eq!(detail.sale.number, "00000001");
    }

    #[tokio::test]
    async fn test_huge_tax_is_rejected_and_rolled_back() {
        let fx = Fixture::new().await;
        let mut new_sale = fx.new_sale(vec![line(&fx.variant_a.id, 2, 10_000)]);
        new_sale.tax_cents = i64::MAX;

        let err = fx.db.sales().create_sale(&new_sale).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 10);
    }

    #[tokio::test]
    async fn test_customer_checks() {
        let fx = Fixture::new().await;
        let sales = fx.db.sales();

        let mut new_sale = fx.new_sale(vec![line(&fx.variant_a.id, 1, 10_000)]);
        new_sale.customer_id = Uuid::new_v4().to_string();
        let err = sales.create_sale(&new_sale).await.unwrap_err();
        assert_eq!(err.code(), "CUSTOMER_NOT_FOUND");

        fx.db.customers().set_active(&fx.customer.id, false).await.unwrap();
        let new_sale = fx.new_sale(vec![line(&fx.variant_a.id, 1, 10_000)]);
        let err = sales.create_sale(&new_sale).await.unwrap_err();
        assert_eq!(err.code(), "CUSTOMER_INACTIVE");
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 10);
    }

    #[tokio::test]
    async fn test_unknown_variant() {
        let fx = Fixture::new().await;
        let new_sale = fx.new_sale(vec![line(&Uuid::new_v4().to_string(), 1, 10_000)]);
        let err = fx.db.sales().create_sale(&new_sale).await.unwrap_err();
        assert_eq!(err.code(), "VARIANT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_sale_item_moves_stock_and_totals() {
        let fx = Fixture::new().await;
        let detail = fx.sell(&fx.variant_a.id, 3, 10_000).await;
        let item_id = detail.items[0].id.clone();
        let sales = fx.db.sales();

        let changes = SaleItemChanges {
            quantity: Some(5),
            ..Default::default()
        };
        let item = sales.update_sale_item(&item_id, &changes).await.unwrap();
        assert_eq!(item.subtotal_cents, 50_000);
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 5);

        let changes = SaleItemChanges {
            quantity: Some(2),
            item_discount_cents: Some(1_000),
            ..Default::default()
        };
        let item = sales.update_sale_item(&item_id, &changes).await.unwrap();
        assert_eq!(item.subtotal_cents, 19_000);
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 8);

        let sale = sales.get_sale(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.subtotal_cents, 19_000);
        assert_eq!(sale.total_cents, 19_000);

        let changes = SaleItemChanges {
            quantity: Some(11),
            ..Default::default()
        };
        let err = sales.update_sale_item(&item_id, &changes).await.unwrap_err();
        assert!(matches!(
            err.as_business(),
            Some(CoreError::InsufficientStock { available: 8, requested: 9, .. })
        ));
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 8);
    }

    #[tokio::test]
    async fn test_update_sale_item_rejects_bad_quantity_by_item_id() {
        let fx = Fixture::new().await;
        let detail = fx.sell(&fx.variant_a.id, 3, 10_000).await;
        let item_id = detail.items[0].id.clone();
        let sales = fx.db.sales();

        for quantity in [0, MAX_ITEM_QUANTITY + 1] {
            let changes = SaleItemChanges {
                quantity: Some(quantity),
                ..Default::default()
            };
            let err = sales.update_sale_item(&item_id, &changes).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_LINE_ITEM");
            match err.as_business() {
                Some(CoreError::InvalidSaleItem { sale_item_id, .. }) => {
                    assert_eq!(sale_item_id, &item_id)
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 7);
    }

    #[tokio::test]
    async fn test_delete_sale_item() {
        let fx = Fixture::new().await;
        let new_sale = fx.new_sale(vec![
            line(&fx.variant_a.id, 3, 10_000),
            line(&fx.variant_b.id, 2, 5_000),
        ]);
        let detail = fx.db.sales().create_sale(&new_sale).await.unwrap();
        let sales = fx.db.sales();

        sales.delete_sale_item(&detail.items[1].id).await.unwrap();
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 5);

        let sale = sales.get_sale(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.subtotal_cents, 30_000);

        let err = sales.delete_sale_item(&detail.items[0].id).await.unwrap_err();
        assert_eq!(err.as_business(), Some(&CoreError::EmptySale));

        let err = sales.delete_sale_item("missing").await.unwrap_err();
        assert_eq!(err.code(), "SALE_ITEM_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_line_maintenance_blocked_on_cancelled_sale() {
        let fx = Fixture::new().await;
        let detail = fx
            .db
            .sales()
            .create_sale(&fx.new_sale(vec![line(&fx.variant_a.id, 1, 10_000)]))
            .await
            .unwrap();
        fx.db
            .sales()
            .update_sale_status(&detail.sale.id, SaleStatus::Cancelled)
            .await
            .unwrap();

        // Cancelling keeps the stock reserved
        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 9);

        let changes = SaleItemChanges {
            quantity: Some(2),
            ..Default::default()
        };
        let err = fx
            .db
            .sales()
            .update_sale_item(&detail.items[0].id, &changes)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SALE_STATUS");
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock() {
        let fx = Fixture::new().await;
        let new_sale = fx.new_sale(vec![
            line(&fx.variant_a.id, 3, 10_000),
            line(&fx.variant_b.id, 2, 5_000),
        ]);
        let detail = fx.db.sales().create_sale(&new_sale).await.unwrap();

        fx.db.sales().delete_sale(&detail.sale.id).await.unwrap();

        assert_eq!(fx.stock_of(&fx.variant_a.id).await, 10);
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 5);
        assert!(fx.db.sales().get_sale_detail(&detail.sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let fx = Fixture::new().await;
        let detail = fx
            .db
            .sales()
            .create_sale(&fx.new_sale(vec![line(&fx.variant_a.id, 1, 10_000)]))
            .await
            .unwrap();
        let sales = fx.db.sales();
        let id = &detail.sale.id;

        let sale = sales.update_sale_status(id, SaleStatus::Paid).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Paid);

        // Idempotent rewrite
        sales.update_sale_status(id, SaleStatus::Paid).await.unwrap();

        let err = sales.update_sale_status(id, SaleStatus::Pending).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");

        let sale = sales.admin_set_status(id, SaleStatus::Pending).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);

        let err = sales.update_sale_status("missing", SaleStatus::Paid).await.unwrap_err();
        assert_eq!(err.code(), "SALE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_verify_sale_totals_detects_drift() {
        let fx = Fixture::new().await;
        let detail = fx.sell(&fx.variant_a.id, 2, 10_000).await;
        let sales = fx.db.sales();

        assert!(sales.verify_sale_totals(&detail.sale.id).await.unwrap().is_consistent());

        sqlx::query("UPDATE sales SET total_cents = 1 WHERE id = ?1")
            .bind(&detail.sale.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        let check = sales.verify_sale_totals(&detail.sale.id).await.unwrap();
        assert!(!check.is_consistent());
        assert_eq!(check.computed.total.cents(), 20_000);
    }

    #[tokio::test]
    async fn test_lookups_and_details() {
        let fx = Fixture::new().await;
        let first = fx.sell(&fx.variant_a.id, 1, 10_000).await;
        fx.db
            .sales()
            .create_sale(&fx.new_sale(vec![line(&fx.variant_b.id, 1, 5_000)]))
            .await
            .unwrap();
        let sales = fx.db.sales();

        let by_number = sales.get_sale_by_number("1").await.unwrap().unwrap();
        assert_eq!(by_number.id, first.sale.id);
        assert!(sales.get_sale_by_number("abc").await.unwrap().is_none());

        let paid = sales
            .list_sales(&SaleFilter {
                status: Some(SaleStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paid.len(), 1);

        let mine = sales
            .list_sales(&SaleFilter {
                customer_id: Some(fx.customer.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let sale = sales
            .update_sale_details(
                &first.sale.id,
                &SaleDetailsUpdate {
                    payment_method: Some(PaymentMethod::MercadoPago),
                    seller: Some("Lucía".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(sale.payment_method, PaymentMethod::MercadoPago);
        assert_eq!(sale.seller.as_deref(), Some("Lucía"));
        assert_eq!(sale.status, SaleStatus::Paid);
        assert_eq!(sale.total_cents, 10_000);

        assert_eq!(sales.list_sale_items(&first.sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let path = std::env::temp_dir().join(format!("atelier-{}.db", Uuid::new_v4()));
        let fx = Fixture::with_config(DbConfig::new(&path).max_connections(8)).await;
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 5);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sales = fx.db.sales();
            let new_sale = fx.new_sale(vec![line(&fx.variant_b.id, 2, 5_000)]);
            handles.push(tokio::spawn(async move { sales.create_sale(&new_sale).await }));
        }

        let mut numbers = Vec::new();
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(detail) => numbers.push(detail.sale.number),
                Err(e) => {
                    assert_eq!(e.code(), "INSUFFICIENT_STOCK");
                    rejected += 1;
                }
            }
        }

        assert_eq!(numbers.len(), 2);
        assert_eq!(rejected, 6);
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 2);
        assert_eq!(fx.stock_of(&fx.variant_b.id).await, 1);

        fx.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

//! # Catalog Repository
//!
//! Categories, garments, sizes, colors and the variants that carry stock.
//!
//! ```text
//! Category ──< Garment ──< Variant >── Size
//!                             │
//!                             └──────>── Color
//! ```
//!
//! A variant referenced by sale lines cannot be deleted; deactivate it
//! instead ([`CatalogRepository::set_variant_active`]).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock;
use atelier_core::validation::{validate_catalog_prices, validate_name, validate_stock_value};
use atelier_core::{Category, Color, CoreError, Garment, Size, Variant};

const GARMENT_COLUMNS: &str = r#"
    id, code, name, category_id, cost_price_cents, sale_price_cents,
    is_active, created_at, updated_at
"#;

const VARIANT_COLUMNS: &str = r#"
    id, garment_id, size_id, color_id, stock, barcode, is_active, created_at, updated_at
"#;

/// Default number of units at or below which a variant counts as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Reference Data
    // =========================================================================

    pub async fn insert_category(&self, name: &str, description: Option<&str>) -> DbResult<Category> {
        validate_name("category", name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
        };

        sqlx::query("INSERT INTO categories (id, name, description) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn insert_size(&self, name: &str, sort_order: i64) -> DbResult<Size> {
        validate_name("size", name)?;

        let size = Size {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            sort_order,
        };

        sqlx::query("INSERT INTO sizes (id, name, sort_order) VALUES (?1, ?2, ?3)")
            .bind(&size.id)
            .bind(&size.name)
            .bind(size.sort_order)
            .execute(&self.pool)
            .await?;

        Ok(size)
    }

    pub async fn insert_color(&self, name: &str, hex_code: Option<&str>) -> DbResult<Color> {
        validate_name("color", name)?;

        let color = Color {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            hex_code: hex_code.map(str::to_string),
        };

        sqlx::query("INSERT INTO colors (id, name, hex_code) VALUES (?1, ?2, ?3)")
            .bind(&color.id)
            .bind(&color.name)
            .bind(&color.hex_code)
            .execute(&self.pool)
            .await?;

        Ok(color)
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_sizes(&self) -> DbResult<Vec<Size>> {
        let rows = sqlx::query_as::<_, Size>(
            "SELECT id, name, sort_order FROM sizes ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_colors(&self) -> DbResult<Vec<Color>> {
        let rows = sqlx::query_as::<_, Color>("SELECT id, name, hex_code FROM colors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // =========================================================================
    // Garments
    // =========================================================================

    /// Inserts a garment. The code is stored upper-case.
    pub async fn insert_garment(&self, garment: &Garment) -> DbResult<Garment> {
        validate_name("code", &garment.code)?;
        validate_name("name", &garment.name)?;
        validate_catalog_prices(garment.cost_price_cents, garment.sale_price_cents)?;

        let mut garment = garment.clone();
        garment.code = garment.code.trim().to_uppercase();

        debug!(id = %garment.id, code = %garment.code, "Inserting garment");

        sqlx::query(
            r#"
            INSERT INTO garments (
                id, code, name, category_id, cost_price_cents, sale_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&garment.id)
        .bind(&garment.code)
        .bind(&garment.name)
        .bind(&garment.category_id)
        .bind(garment.cost_price_cents)
        .bind(garment.sale_price_cents)
        .bind(garment.is_active)
        .bind(garment.created_at)
        .bind(garment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(garment)
    }

    pub async fn get_garment(&self, id: &str) -> DbResult<Option<Garment>> {
        let sql = format!("SELECT {} FROM garments WHERE id = ?1", GARMENT_COLUMNS);
        let garment = sqlx::query_as::<_, Garment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(garment)
    }

    pub async fn count_garments(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM garments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Creates the variant (garment, size, color) with an initial stock.
    ///
    /// The barcode defaults to `{garment code}-{size id}-{color id}`.
    pub async fn insert_variant(
        &self,
        garment_id: &str,
        size_id: &str,
        color_id: &str,
        stock: i64,
    ) -> DbResult<Variant> {
        validate_stock_value(stock)?;

        let garment = self
            .get_garment(garment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Garment", garment_id))?;

        let now = Utc::now();
        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            garment_id: garment_id.to_string(),
            size_id: size_id.to_string(),
            color_id: color_id.to_string(),
            stock,
            barcode: Some(format!("{}-{}-{}", garment.code, size_id, color_id)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %variant.id, garment = %garment.code, stock = stock, "Inserting variant");

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, garment_id, size_id, color_id, stock, barcode,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.garment_id)
        .bind(&variant.size_id)
        .bind(&variant.color_id)
        .bind(variant.stock)
        .bind(&variant.barcode)
        .bind(variant.is_active)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(variant)
    }

    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let mut conn = self.pool.acquire().await?;
        fetch_variant(&mut conn, id).await
    }

    pub async fn get_variant_by_barcode(&self, barcode: &str) -> DbResult<Option<Variant>> {
        let sql = format!("SELECT {} FROM variants WHERE barcode = ?1", VARIANT_COLUMNS);
        let variant = sqlx::query_as::<_, Variant>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(variant)
    }

    pub async fn list_variants(&self, garment_id: &str) -> DbResult<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(
            r#"
            SELECT
                v.id, v.garment_id, v.size_id, v.color_id, v.stock, v.barcode,
                v.is_active, v.created_at, v.updated_at
            FROM variants v
            JOIN sizes s ON s.id = v.size_id
            JOIN colors c ON c.id = v.color_id
            WHERE v.garment_id = ?1
            ORDER BY s.sort_order, c.name
            "#,
        )
            .bind(garment_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(variants)
    }

    /// Active variants with `stock <= threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Variant>> {
        let sql = format!(
            "SELECT {} FROM variants WHERE is_active = 1 AND stock <= ?1 ORDER BY stock, id",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        Ok(variants)
    }

    /// Sets an absolute stock value through the ledger.
    pub async fn set_stock(&self, variant_id: &str, value: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        stock::set_stock(&mut conn, variant_id, value).await
    }

    /// Deactivated variants keep their stock and history but cannot be sold.
    pub async fn set_variant_active(&self, variant_id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE variants SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(variant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::VariantNotFound(variant_id.to_string()).into());
        }

        debug!(variant_id = %variant_id, active = active, "Variant active flag set");
        Ok(())
    }

    /// Deletes a variant that no sale line references.
    pub async fn delete_variant(&self, variant_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE variant_id = ?1")
                .bind(variant_id)
                .fetch_one(&mut *tx)
                .await?;

        if referenced > 0 {
            return Err(CoreError::RecordReferenced {
                entity: "Variant".to_string(),
                id: variant_id.to_string(),
                referenced_by: format!("{} sale item(s)", referenced),
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM variants WHERE id = ?1")
            .bind(variant_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::VariantNotFound(variant_id.to_string()).into());
        }

        tx.commit().await?;
        debug!(variant_id = %variant_id, "Variant deleted");
        Ok(())
    }
}

pub(crate) async fn fetch_variant(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Variant>> {
    let sql = format!("SELECT {} FROM variants WHERE id = ?1", VARIANT_COLUMNS);
    let variant = sqlx::query_as::<_, Variant>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(variant)
}

/// Builds an active garment with a fresh id.
pub fn new_garment(
    code: impl Into<String>,
    name: impl Into<String>,
    category_id: impl Into<String>,
    cost_price_cents: i64,
    sale_price_cents: i64,
) -> Garment {
    let now = Utc::now();
    Garment {
        id: Uuid::new_v4().to_string(),
        code: code.into(),
        name: name.into(),
        category_id: category_id.into(),
        cost_price_cents,
        sale_price_cents,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_variant_barcode_and_lookup() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();

        let barcode = fx.variant_a.barcode.clone().unwrap();
        assert!(barcode.starts_with("BODY-"));

        let found = catalog.get_variant_by_barcode(&barcode).await.unwrap().unwrap();
        assert_eq!(found.id, fx.variant_a.id);

        let variants = catalog.list_variants(&fx.variant_a.garment_id).await.unwrap();
        assert_eq!(variants.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_combination_rejected() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .catalog()
            .insert_variant(
                &fx.variant_a.garment_id,
                &fx.variant_a.size_id,
                &fx.variant_a.color_id,
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_low_stock() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();

        let low = catalog.low_stock(DEFAULT_LOW_STOCK_THRESHOLD).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, fx.variant_b.id);

        catalog.set_variant_active(&fx.variant_b.id, false).await.unwrap();
        assert!(catalog.low_stock(DEFAULT_LOW_STOCK_THRESHOLD).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_variant_restricted_when_sold() {
        let fx = Fixture::new().await;
        fx.sell(&fx.variant_a.id, 1, 1_000).await;

        let err = fx.db.catalog().delete_variant(&fx.variant_a.id).await.unwrap_err();
        assert_eq!(err.code(), "RECORD_REFERENCED");

        fx.db.catalog().delete_variant(&fx.variant_b.id).await.unwrap();
        assert!(fx.db.catalog().get_variant(&fx.variant_b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_garment_prices() {
        let fx = Fixture::new().await;
        let garment = new_garment("X1", "Test", fx.category_id.clone(), 100, 0);
        let err = fx.db.catalog().insert_garment(&garment).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}

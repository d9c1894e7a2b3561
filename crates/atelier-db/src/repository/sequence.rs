//! Named counters (`sequences` table).
//!
//! `next_value` is a single upsert statement, so two transactions can never
//! read the same value: the second blocks on the write lock until the first
//! commits or rolls back. A rolled-back transaction gives its value back.

use sqlx::SqliteConnection;

use crate::error::DbResult;
use atelier_core::sale_number::format_sale_number;

pub const SALE_NUMBER: &str = "sale_number";

/// Increments counter `name` and returns the new value (first call yields 1).
pub async fn next_value(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sequences (name, value) VALUES (?1, 1)
        ON CONFLICT (name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

pub async fn current_value(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(value.unwrap_or(0))
}

/// Allocates the next sale number ("00000001", "00000002", ...).
pub async fn next_sale_number(conn: &mut SqliteConnection) -> DbResult<String> {
    let n = next_value(conn, SALE_NUMBER).await?;
    Ok(format_sale_number(n))
}

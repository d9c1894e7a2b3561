//! # Customer Repository
//!
//! The customer directory as seen by sales: existence and the active flag.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use atelier_core::validation::{validate_email, validate_name, validate_optional_text};
use atelier_core::{Customer, DocumentType};

const CUSTOMER_COLUMNS: &str = r#"
    id, first_name, last_name, document_type, document_number,
    email, phone, is_active, created_at, updated_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer after validating names and e-mail.
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        validate_name("first_name", &customer.first_name)?;
        validate_name("last_name", &customer.last_name)?;
        validate_optional_text("document_number", customer.document_number.as_deref(), 20)?;
        validate_optional_text("phone", customer.phone.as_deref(), 20)?;
        if let Some(email) = customer.email.as_deref() {
            validate_email(email)?;
        }

        debug!(id = %customer.id, name = %customer.full_name(), "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, first_name, last_name, document_type, document_number,
                email, phone, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.first_name.trim())
        .bind(customer.last_name.trim())
        .bind(customer.document_type)
        .bind(&customer.document_number)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, id).await
    }

    /// Activates or deactivates a customer. Past sales are untouched.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = active, "Setting customer active flag");

        let result = sqlx::query("UPDATE customers SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Lists customers ordered by last name, then first name.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers WHERE (?1 = 0 OR is_active = 1) ORDER BY last_name, first_name",
            CUSTOMER_COLUMNS
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }
}

/// Loads a customer on an existing connection or transaction.
pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

/// Builds an active customer with a fresh id.
pub fn new_customer(
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    document_type: DocumentType,
    document_number: Option<String>,
) -> Customer {
    let now = Utc::now();
    Customer {
        id: Uuid::new_v4().to_string(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        document_type,
        document_number,
        email: None,
        phone: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

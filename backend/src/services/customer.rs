//! Customer management service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation, validation_errors, AppError, AppResult};
use crate::services::sale::{customer_sale_views, SaleView};
use shared::{Customer, CustomerContact, CustomerSummary, Money};

/// Customer service for managing the customer registry
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

/// Database row for a customer
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: Uuid,
    user_id: Uuid,
    document: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    credit_balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            user_id: row.user_id,
            document: row.document,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            credit_balance: Money::new(row.credit_balance),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for the customer listing with aggregates
#[derive(Debug, sqlx::FromRow)]
struct CustomerSummaryRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    sales_count: i64,
    total_spent: Decimal,
    pending_credits: Decimal,
}

pub(crate) const CUSTOMER_COLUMNS: &str =
    "id, user_id, document, name, email, phone, address, credit_balance, created_at, updated_at";

/// Input for creating a customer
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 3, max = 20, message = "Document must have 3 to 20 characters"))]
    pub document: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Input for updating a customer
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// A customer with their sales, newest first
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSales {
    pub customer: Customer,
    pub credit_balance: Money,
    pub sales: Vec<SaleView>,
}

fn check_contact(document: &str, email: Option<&str>, phone: Option<&str>) -> AppResult<()> {
    shared::validate_document(document).map_err(|msg| AppError::Validation {
        field: "document".to_string(),
        message: msg.to_string(),
        message_es: "Documento inválido".to_string(),
    })?;
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        shared::validate_email(email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
            message_es: "Correo electrónico inválido".to_string(),
        })?;
    }
    if let Some(phone) = phone.filter(|p| !p.is_empty()) {
        shared::validate_phone(phone).map_err(|msg| AppError::Validation {
            field: "phone".to_string(),
            message: msg.to_string(),
            message_es: "Teléfono inválido".to_string(),
        })?;
    }
    Ok(())
}

/// Find the customer with `contact.document`, creating it on first use.
/// The returned row is locked until the surrounding transaction ends.
pub(crate) async fn upsert_customer(
    conn: &mut PgConnection,
    user_id: Uuid,
    contact: &CustomerContact,
) -> AppResult<Customer> {
    check_contact(&contact.document, contact.email.as_deref(), contact.phone.as_deref())?;

    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        r#"
        INSERT INTO customers (user_id, document, name, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, document)
        DO UPDATE SET email = COALESCE(customers.email, EXCLUDED.email),
                      phone = COALESCE(customers.phone, EXCLUDED.phone),
                      updated_at = NOW()
        RETURNING {}
        "#,
        CUSTOMER_COLUMNS
    ))
    .bind(user_id)
    .bind(contact.document.trim())
    .bind(contact.name.trim())
    .bind(&contact.email)
    .bind(&contact.phone)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

impl CustomerService {
    /// Create a new CustomerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List customers with sales aggregates
    pub async fn list_customers(&self, user_id: Uuid) -> AppResult<Vec<CustomerSummary>> {
        let rows = sqlx::query_as::<_, CustomerSummaryRow>(
            r#"
            SELECT c.id, c.user_id, c.document, c.name, c.email, c.phone, c.address,
                   c.credit_balance, c.created_at, c.updated_at,
                   COUNT(s.id) FILTER (WHERE s.status = 'COMPLETED') AS sales_count,
                   COALESCE(SUM(s.total) FILTER (WHERE s.status = 'COMPLETED'), 0) AS total_spent,
                   COALESCE(SUM(s.remaining_balance) FILTER (
                       WHERE s.status = 'COMPLETED' AND s.payment_method IN ('credit', 'combined')
                   ), 0) AS pending_credits
            FROM customers c
            LEFT JOIN sales s ON s.customer_id = c.id AND s.user_id = c.user_id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CustomerSummary {
                customer: row.customer.into(),
                sales_count: row.sales_count,
                total_spent: Money::new(row.total_spent),
                pending_credits: Money::new(row.pending_credits),
            })
            .collect())
    }

    /// Get a customer by ID
    pub async fn get_customer(&self, user_id: Uuid, customer_id: Uuid) -> AppResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE id = $1 AND user_id = $2",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }

    /// Create a customer; documents are unique per tenant
    pub async fn create_customer(&self, user_id: Uuid, input: CreateCustomerInput) -> AppResult<Customer> {
        input.validate().map_err(validation_errors)?;
        check_contact(&input.document, input.email.as_deref(), input.phone.as_deref())?;

        let result = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO customers (user_id, document, name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.document.trim())
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(row) => {
                tracing::info!(user_id = %user_id, customer_id = %row.id, "Customer created");
                Ok(row.into())
            }
            Err(err) if unique_violation(&err).is_some() => Err(AppError::DuplicateEntry("document".to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Update contact fields of a customer
    pub async fn update_customer(
        &self,
        user_id: Uuid,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        input.validate().map_err(validation_errors)?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            UPDATE customers
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                updated_at = NOW()
            WHERE id = $5 AND user_id = $6
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }

    /// Delete a customer who owes nothing
    pub async fn delete_customer(&self, user_id: Uuid, customer_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT credit_balance FROM customers WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        let balance = Money::new(balance);
        if !balance.is_zero() {
            return Err(AppError::Conflict {
                resource: "customer".to_string(),
                message: format!("Customer still owes {}", balance),
                message_es: format!("El cliente aún debe {}", balance),
            });
        }

        sqlx::query("DELETE FROM customers WHERE id = $1 AND user_id = $2")
            .bind(customer_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, customer_id = %customer_id, "Customer deleted");
        Ok(())
    }

    /// Sales of one customer, newest first
    pub async fn customer_sales(&self, user_id: Uuid, customer_id: Uuid) -> AppResult<CustomerSales> {
        let customer = self.get_customer(user_id, customer_id).await?;
        let sales = customer_sale_views(&self.db, user_id, customer_id).await?;

        Ok(CustomerSales {
            credit_balance: customer.credit_balance,
            customer,
            sales,
        })
    }
}

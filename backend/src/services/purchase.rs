//! Purchase (expense) service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{validation_errors, AppError, AppResult};
use shared::{purchase_stats, BusinessCalendar, Money, Purchase, PurchaseStats};

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    calendar: BusinessCalendar,
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    date: NaiveDate,
    category: String,
    concept: String,
    notes: Option<String>,
    fixed_cost_id: Option<Uuid>,
    is_partial_payment: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Purchase {
            id: row.id,
            user_id: row.user_id,
            amount: Money::new(row.amount),
            date: row.date,
            category: row.category,
            concept: row.concept,
            notes: row.notes,
            fixed_cost_id: row.fixed_cost_id,
            is_partial_payment: row.is_partial_payment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PURCHASE_COLUMNS: &str =
    "id, user_id, amount, date, category, concept, notes, fixed_cost_id, is_partial_payment, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseInput {
    pub amount: Money,
    /// Defaults to the business-local today
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, max = 255, message = "Concept is required"))]
    pub concept: String,
    pub notes: Option<String>,
    pub fixed_cost_id: Option<Uuid>,
    #[serde(default)]
    pub is_partial_payment: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePurchaseInput {
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub concept: Option<String>,
    pub notes: Option<String>,
    pub fixed_cost_id: Option<Uuid>,
    pub is_partial_payment: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPurchasesQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub category: Option<String>,
}

fn check_amount(amount: Money) -> AppResult<()> {
    shared::validate_positive_amount(amount).map_err(|msg| {
        AppError::validation("amount", msg.to_string(), "El monto debe ser mayor que cero".to_string())
    })
}

impl PurchaseService {
    pub fn new(db: PgPool, calendar: BusinessCalendar) -> Self {
        Self { db, calendar }
    }

    /// Purchases, newest date first
    pub async fn list_purchases(&self, user_id: Uuid, query: ListPurchasesQuery) -> AppResult<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            SELECT {}
            FROM purchases
            WHERE user_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
              AND ($4::text IS NULL OR category = $4)
            ORDER BY date DESC, created_at DESC
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(user_id)
        .bind(query.date_from)
        .bind(query.date_to)
        .bind(&query.category)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    pub async fn get_purchase(&self, user_id: Uuid, purchase_id: Uuid) -> AppResult<Purchase> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE id = $1 AND user_id = $2",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        Ok(row.into())
    }

    pub async fn create_purchase(&self, user_id: Uuid, input: CreatePurchaseInput) -> AppResult<Purchase> {
        input.validate().map_err(validation_errors)?;
        check_amount(input.amount)?;
        let date = input.date.unwrap_or_else(|| self.calendar.today(Utc::now()));

        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            INSERT INTO purchases (user_id, amount, date, category, concept, notes, fixed_cost_id, is_partial_payment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(user_id)
        .bind(input.amount.amount())
        .bind(date)
        .bind(input.category.trim())
        .bind(input.concept.trim())
        .bind(&input.notes)
        .bind(input.fixed_cost_id)
        .bind(input.is_partial_payment)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user_id, purchase_id = %row.id, amount = %row.amount, date = %row.date, "Purchase recorded");
        Ok(row.into())
    }

    pub async fn update_purchase(
        &self,
        user_id: Uuid,
        purchase_id: Uuid,
        input: UpdatePurchaseInput,
    ) -> AppResult<Purchase> {
        input.validate().map_err(validation_errors)?;
        if let Some(amount) = input.amount {
            check_amount(amount)?;
        }

        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            UPDATE purchases
            SET amount = COALESCE($1, amount),
                date = COALESCE($2, date),
                category = COALESCE($3, category),
                concept = COALESCE($4, concept),
                notes = COALESCE($5, notes),
                fixed_cost_id = COALESCE($6, fixed_cost_id),
                is_partial_payment = COALESCE($7, is_partial_payment),
                updated_at = NOW()
            WHERE id = $8 AND user_id = $9
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(input.amount.map(|m| m.amount()))
        .bind(input.date)
        .bind(&input.category)
        .bind(&input.concept)
        .bind(&input.notes)
        .bind(input.fixed_cost_id)
        .bind(input.is_partial_payment)
        .bind(purchase_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        Ok(row.into())
    }

    pub async fn delete_purchase(&self, user_id: Uuid, purchase_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1 AND user_id = $2")
            .bind(purchase_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase".to_string()));
        }
        Ok(())
    }

    pub async fn stats(&self, user_id: Uuid) -> AppResult<PurchaseStats> {
        let purchases = self.list_purchases(user_id, ListPurchasesQuery::default()).await?;
        Ok(purchase_stats(&purchases, self.calendar.today(Utc::now())))
    }

    /// Distinct categories in use
    pub async fn categories(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM purchases WHERE user_id = $1 ORDER BY category ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }
}

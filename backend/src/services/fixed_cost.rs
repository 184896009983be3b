//! Fixed cost definitions and their per-month overrides

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{validation_errors, AppError, AppResult};
use shared::{
    fixed_cost_stats, month_status, FixedCost, FixedCostMonthStatus, FixedCostPeriod, FixedCostStats,
    Frequency, Money,
};

#[derive(Clone)]
pub struct FixedCostService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct FixedCostRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    amount: Decimal,
    description: Option<String>,
    frequency: String,
    due_date: Option<i32>,
    category: Option<String>,
    is_active: bool,
    is_paid: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FixedCostRow> for FixedCost {
    type Error = AppError;

    fn try_from(row: FixedCostRow) -> Result<Self, Self::Error> {
        Ok(FixedCost {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            amount: Money::new(row.amount),
            description: row.description,
            frequency: Frequency::from_str(&row.frequency)?,
            due_date: row.due_date,
            category: row.category,
            is_active: row.is_active,
            is_paid: row.is_paid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FixedCostPeriodRow {
    id: Uuid,
    user_id: Uuid,
    fixed_cost_id: Uuid,
    month: String,
    is_active: bool,
    is_paid: bool,
    partial_amount: Option<Decimal>,
    paid_amount: Option<Decimal>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FixedCostPeriodRow> for FixedCostPeriod {
    fn from(row: FixedCostPeriodRow) -> Self {
        FixedCostPeriod {
            id: row.id,
            user_id: row.user_id,
            fixed_cost_id: row.fixed_cost_id,
            month: row.month,
            is_active: row.is_active,
            is_paid: row.is_paid,
            partial_amount: row.partial_amount.map(Money::new),
            paid_amount: row.paid_amount.map(Money::new),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const FIXED_COST_COLUMNS: &str =
    "id, user_id, name, amount, description, frequency, due_date, category, is_active, is_paid, created_at, updated_at";

const PERIOD_COLUMNS: &str = "id, user_id, fixed_cost_id, month, is_active, is_paid, partial_amount, paid_amount, notes, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFixedCostInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub amount: Money,
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    pub due_date: Option<i32>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub is_paid: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFixedCostInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub due_date: Option<i32>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub is_paid: Option<bool>,
}

/// Override of a fixed cost for one month
#[derive(Debug, Deserialize, Validate)]
pub struct SetPeriodStatusInput {
    pub month: String,
    pub is_active: Option<bool>,
    pub is_paid: Option<bool>,
    pub partial_amount: Option<Money>,
    pub paid_amount: Option<Money>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

fn check_amount_and_due_day(amount: Option<Money>, due_date: Option<i32>) -> AppResult<()> {
    if let Some(amount) = amount {
        shared::validate_non_negative_amount(amount).map_err(|msg| {
            AppError::validation("amount", msg.to_string(), "El monto no puede ser negativo".to_string())
        })?;
    }
    if let Some(day) = due_date {
        shared::validate_due_day(day).map_err(|msg| {
            AppError::validation("due_date", msg.to_string(), "El día de pago debe estar entre 1 y 31".to_string())
        })?;
    }
    Ok(())
}

fn check_month(month: &str) -> AppResult<()> {
    shared::validate_month(month)
        .map_err(|msg| AppError::validation("month", msg.to_string(), "El mes debe tener la forma AAAA-MM".to_string()))
}

impl FixedCostService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_fixed_costs(&self, user_id: Uuid) -> AppResult<Vec<FixedCost>> {
        let rows = sqlx::query_as::<_, FixedCostRow>(&format!(
            "SELECT {} FROM fixed_costs WHERE user_id = $1 ORDER BY name ASC",
            FIXED_COST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FixedCost::try_from).collect()
    }

    pub async fn get_fixed_cost(&self, user_id: Uuid, fixed_cost_id: Uuid) -> AppResult<FixedCost> {
        let row = sqlx::query_as::<_, FixedCostRow>(&format!(
            "SELECT {} FROM fixed_costs WHERE id = $1 AND user_id = $2",
            FIXED_COST_COLUMNS
        ))
        .bind(fixed_cost_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Fixed cost".to_string()))?;

        row.try_into()
    }

    pub async fn create_fixed_cost(&self, user_id: Uuid, input: CreateFixedCostInput) -> AppResult<FixedCost> {
        input.validate().map_err(validation_errors)?;
        check_amount_and_due_day(Some(input.amount), input.due_date)?;

        let row = sqlx::query_as::<_, FixedCostRow>(&format!(
            r#"
            INSERT INTO fixed_costs (user_id, name, amount, description, frequency, due_date, category, is_active, is_paid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FIXED_COST_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.amount.amount())
        .bind(&input.description)
        .bind(input.frequency.as_str())
        .bind(input.due_date)
        .bind(&input.category)
        .bind(input.is_active.unwrap_or(true))
        .bind(input.is_paid.unwrap_or(false))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user_id, fixed_cost_id = %row.id, amount = %row.amount, "Fixed cost created");
        row.try_into()
    }

    pub async fn update_fixed_cost(
        &self,
        user_id: Uuid,
        fixed_cost_id: Uuid,
        input: UpdateFixedCostInput,
    ) -> AppResult<FixedCost> {
        input.validate().map_err(validation_errors)?;
        check_amount_and_due_day(input.amount, input.due_date)?;

        let row = sqlx::query_as::<_, FixedCostRow>(&format!(
            r#"
            UPDATE fixed_costs
            SET name = COALESCE($1, name),
                amount = COALESCE($2, amount),
                description = COALESCE($3, description),
                frequency = COALESCE($4, frequency),
                due_date = COALESCE($5, due_date),
                category = COALESCE($6, category),
                is_active = COALESCE($7, is_active),
                is_paid = COALESCE($8, is_paid),
                updated_at = NOW()
            WHERE id = $9 AND user_id = $10
            RETURNING {}
            "#,
            FIXED_COST_COLUMNS
        ))
        .bind(&input.name)
        .bind(input.amount.map(|m| m.amount()))
        .bind(&input.description)
        .bind(input.frequency.map(|f| f.as_str()))
        .bind(input.due_date)
        .bind(&input.category)
        .bind(input.is_active)
        .bind(input.is_paid)
        .bind(fixed_cost_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Fixed cost".to_string()))?;

        row.try_into()
    }

    pub async fn delete_fixed_cost(&self, user_id: Uuid, fixed_cost_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM fixed_costs WHERE id = $1 AND user_id = $2")
            .bind(fixed_cost_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Fixed cost".to_string()));
        }
        Ok(())
    }

    /// Flip the paid flag. `updated_at` then dates the payment for the cash session.
    pub async fn toggle_payment(&self, user_id: Uuid, fixed_cost_id: Uuid) -> AppResult<FixedCost> {
        let row = sqlx::query_as::<_, FixedCostRow>(&format!(
            r#"
            UPDATE fixed_costs
            SET is_paid = NOT is_paid, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            FIXED_COST_COLUMNS
        ))
        .bind(fixed_cost_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Fixed cost".to_string()))?;

        tracing::info!(user_id = %user_id, fixed_cost_id = %fixed_cost_id, is_paid = row.is_paid, "Fixed cost payment toggled");
        row.try_into()
    }

    pub async fn stats(&self, user_id: Uuid) -> AppResult<FixedCostStats> {
        let costs = self.list_fixed_costs(user_id).await?;
        Ok(fixed_cost_stats(&costs))
    }

    /// Upsert the month override of a fixed cost
    pub async fn set_period_status(
        &self,
        user_id: Uuid,
        fixed_cost_id: Uuid,
        input: SetPeriodStatusInput,
    ) -> AppResult<FixedCostPeriod> {
        input.validate().map_err(validation_errors)?;
        check_month(&input.month)?;
        for (field, amount) in [("partial_amount", input.partial_amount), ("paid_amount", input.paid_amount)] {
            if let Some(amount) = amount {
                shared::validate_non_negative_amount(amount).map_err(|msg| {
                    AppError::validation(field, msg.to_string(), "El monto no puede ser negativo".to_string())
                })?;
            }
        }

        let cost = self.get_fixed_cost(user_id, fixed_cost_id).await?;

        let row = sqlx::query_as::<_, FixedCostPeriodRow>(&format!(
            r#"
            INSERT INTO fixed_cost_periods (user_id, fixed_cost_id, month, is_active, is_paid, partial_amount, paid_amount, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, fixed_cost_id, month)
            DO UPDATE SET is_active = COALESCE($9, fixed_cost_periods.is_active),
                          is_paid = COALESCE($10, fixed_cost_periods.is_paid),
                          partial_amount = COALESCE(EXCLUDED.partial_amount, fixed_cost_periods.partial_amount),
                          paid_amount = COALESCE(EXCLUDED.paid_amount, fixed_cost_periods.paid_amount),
                          notes = COALESCE(EXCLUDED.notes, fixed_cost_periods.notes),
                          updated_at = NOW()
            RETURNING {}
            "#,
            PERIOD_COLUMNS
        ))
        .bind(user_id)
        .bind(fixed_cost_id)
        .bind(&input.month)
        .bind(input.is_active.unwrap_or(cost.is_active))
        .bind(input.is_paid.unwrap_or(cost.is_paid))
        .bind(input.partial_amount.map(|m| m.amount()))
        .bind(input.paid_amount.map(|m| m.amount()))
        .bind(&input.notes)
        .bind(input.is_active)
        .bind(input.is_paid)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            user_id = %user_id,
            fixed_cost_id = %fixed_cost_id,
            month = %row.month,
            is_paid = row.is_paid,
            "Fixed cost period updated"
        );
        Ok(row.into())
    }

    /// Overrides recorded for one fixed cost, newest month first
    pub async fn list_periods(&self, user_id: Uuid, fixed_cost_id: Uuid) -> AppResult<Vec<FixedCostPeriod>> {
        self.get_fixed_cost(user_id, fixed_cost_id).await?;

        let rows = sqlx::query_as::<_, FixedCostPeriodRow>(&format!(
            "SELECT {} FROM fixed_cost_periods WHERE user_id = $1 AND fixed_cost_id = $2 ORDER BY month DESC",
            PERIOD_COLUMNS
        ))
        .bind(user_id)
        .bind(fixed_cost_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(FixedCostPeriod::from).collect())
    }

    /// Every definition with its effective status in `month`
    pub async fn list_for_month(&self, user_id: Uuid, month: &str) -> AppResult<Vec<FixedCostMonthStatus>> {
        check_month(month)?;

        let costs = self.list_fixed_costs(user_id).await?;
        let periods: HashMap<Uuid, FixedCostPeriod> = sqlx::query_as::<_, FixedCostPeriodRow>(&format!(
            "SELECT {} FROM fixed_cost_periods WHERE user_id = $1 AND month = $2",
            PERIOD_COLUMNS
        ))
        .bind(user_id)
        .bind(month)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| (row.fixed_cost_id, FixedCostPeriod::from(row)))
        .collect();

        Ok(costs
            .into_iter()
            .map(|cost| {
                let period = periods.get(&cost.id);
                month_status(cost, period, month)
            })
            .collect())
    }
}

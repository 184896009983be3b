//! Read side of the product stock ledger

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Pagination, PaginatedResponse, StockMovement, StockMovementType};

#[derive(Clone)]
pub struct StockMovementService {
    db: PgPool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockMovementsQuery {
    pub product_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    /// sale or reversal
    pub movement_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductMovementsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct StockMovementRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    product_name: String,
    sale_id: Option<Uuid>,
    movement_type: String,
    quantity: i32,
    previous_stock: i32,
    new_stock: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockMovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: StockMovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            product_name: row.product_name,
            sale_id: row.sale_id,
            movement_type: StockMovementType::from_str(&row.movement_type)?,
            quantity: row.quantity,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            created_at: row.created_at,
        })
    }
}

const MOVEMENT_FILTER: &str = r#"
    m.user_id = $1
      AND ($2::uuid IS NULL OR m.product_id = $2)
      AND ($3::uuid IS NULL OR m.sale_id = $3)
      AND ($4::text IS NULL OR m.movement_type = $4)
"#;

impl StockMovementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stock movements, newest first
    pub async fn list_movements(
        &self,
        user_id: Uuid,
        query: StockMovementsQuery,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let pagination = Pagination::new(query.limit, query.offset);
        let movement_type = query
            .movement_type
            .as_deref()
            .map(StockMovementType::from_str)
            .transpose()?;

        let total_items = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements m WHERE {}",
            MOVEMENT_FILTER
        ))
        .bind(user_id)
        .bind(query.product_id)
        .bind(query.sale_id)
        .bind(movement_type.map(|t| t.as_str()))
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockMovementRow>(&format!(
            r#"
            SELECT m.id, m.user_id, m.product_id, p.name AS product_name, m.sale_id,
                   m.movement_type, m.quantity, m.previous_stock, m.new_stock, m.created_at
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            WHERE {}
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $5 OFFSET $6
            "#,
            MOVEMENT_FILTER
        ))
        .bind(user_id)
        .bind(query.product_id)
        .bind(query.sale_id)
        .bind(movement_type.map(|t| t.as_str()))
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.db)
        .await?;

        let movements = rows
            .into_iter()
            .map(StockMovement::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(movements, pagination, total_items))
    }

    /// Movement history of one product, newest first
    pub async fn product_movements(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        query: ProductMovementsQuery,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND user_id = $2)",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::ProductNotFound(product_id));
        }

        self.list_movements(
            user_id,
            StockMovementsQuery {
                product_id: Some(product_id),
                limit: query.limit,
                offset: query.offset,
                ..Default::default()
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_row_conversion() {
        let row = StockMovementRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Empanada".to_string(),
            sale_id: Some(Uuid::new_v4()),
            movement_type: "reversal".to_string(),
            quantity: 2,
            previous_stock: 5,
            new_stock: 7,
            created_at: Utc::now(),
        };
        let movement = StockMovement::try_from(row).unwrap();
        assert_eq!(movement.movement_type, StockMovementType::Reversal);
        assert_eq!(movement.new_stock - movement.previous_stock, 2);
    }

    #[test]
    fn test_unknown_movement_type_is_rejected() {
        let row = StockMovementRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Empanada".to_string(),
            sale_id: None,
            movement_type: "transfer".to_string(),
            quantity: 1,
            previous_stock: 1,
            new_stock: 0,
            created_at: Utc::now(),
        };
        assert!(StockMovement::try_from(row).is_err());
    }

    #[test]
    fn test_movement_filter_parameters() {
        for param in ["$1", "$2::uuid", "$3::uuid", "$4::text"] {
            assert!(MOVEMENT_FILTER.contains(param), "missing {param}");
        }
    }
}

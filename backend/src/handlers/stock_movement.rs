//! HTTP handlers for the product stock ledger

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock_movement::{
    ProductMovementsQuery, StockMovementService, StockMovementsQuery,
};
use crate::AppState;
use shared::{PaginatedResponse, StockMovement};

/// List stock movements
pub async fn list_stock_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockMovementsQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let movements = StockMovementService::new(state.db)
        .list_movements(current_user.0.user_id, query)
        .await?;
    Ok(Json(movements))
}

/// Stock movement history of one product
pub async fn list_product_stock_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ProductMovementsQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let movements = StockMovementService::new(state.db)
        .product_movements(current_user.0.user_id, product_id, query)
        .await?;
    Ok(Json(movements))
}

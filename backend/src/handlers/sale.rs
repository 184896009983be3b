//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sale::{
    CreateSaleInput, ListSalesQuery, ReverseSaleInput, SaleService, SaleView, SalesStats,
};
use crate::AppState;
use shared::PaginatedResponse;

fn sale_service(state: AppState) -> SaleService {
    SaleService::new(state.db, state.config.business.calendar())
}

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleView>> {
    let sale = sale_service(state).create_sale(current_user.0.user_id, input).await?;
    Ok(Json(sale))
}

/// List sales, newest first
pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListSalesQuery>,
) -> AppResult<Json<PaginatedResponse<SaleView>>> {
    let sales = sale_service(state).list_sales(current_user.0.user_id, query).await?;
    Ok(Json(sales))
}

/// Get a sale by ID
pub async fn get_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleView>> {
    let sale = sale_service(state).get_sale(current_user.0.user_id, sale_id).await?;
    Ok(Json(sale))
}

/// Reverse a completed sale
pub async fn reverse_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<ReverseSaleInput>,
) -> AppResult<Json<SaleView>> {
    let sale = sale_service(state)
        .reverse_sale(current_user.0.user_id, sale_id, input)
        .await?;
    Ok(Json(sale))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// `YYYY-MM`; the current month when absent
    pub month: Option<String>,
}

/// Monthly dashboard figures
pub async fn get_sales_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<SalesStats>> {
    let stats = sale_service(state)
        .sales_stats(current_user.0.user_id, query.month)
        .await?;
    Ok(Json(stats))
}

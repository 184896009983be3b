//! HTTP handlers for fixed costs and their monthly overrides

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::fixed_cost::{
    CreateFixedCostInput, FixedCostService, MonthQuery, SetPeriodStatusInput, UpdateFixedCostInput,
};
use crate::AppState;
use shared::{FixedCost, FixedCostMonthStatus, FixedCostPeriod, FixedCostStats};

pub async fn list_fixed_costs(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<FixedCost>>> {
    let service = FixedCostService::new(state.db);
    let costs = service.list_fixed_costs(current_user.0.user_id).await?;
    Ok(Json(costs))
}

pub async fn create_fixed_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateFixedCostInput>,
) -> AppResult<Json<FixedCost>> {
    let service = FixedCostService::new(state.db);
    let cost = service.create_fixed_cost(current_user.0.user_id, input).await?;
    Ok(Json(cost))
}

pub async fn get_fixed_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
) -> AppResult<Json<FixedCost>> {
    let service = FixedCostService::new(state.db);
    let cost = service.get_fixed_cost(current_user.0.user_id, fixed_cost_id).await?;
    Ok(Json(cost))
}

pub async fn update_fixed_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
    Json(input): Json<UpdateFixedCostInput>,
) -> AppResult<Json<FixedCost>> {
    let service = FixedCostService::new(state.db);
    let cost = service
        .update_fixed_cost(current_user.0.user_id, fixed_cost_id, input)
        .await?;
    Ok(Json(cost))
}

pub async fn delete_fixed_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = FixedCostService::new(state.db);
    service.delete_fixed_cost(current_user.0.user_id, fixed_cost_id).await?;
    Ok(Json(()))
}

/// Flip the paid flag of a fixed cost
pub async fn toggle_fixed_cost_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
) -> AppResult<Json<FixedCost>> {
    let service = FixedCostService::new(state.db);
    let cost = service.toggle_payment(current_user.0.user_id, fixed_cost_id).await?;
    Ok(Json(cost))
}

pub async fn get_fixed_cost_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<FixedCostStats>> {
    let service = FixedCostService::new(state.db);
    let stats = service.stats(current_user.0.user_id).await?;
    Ok(Json(stats))
}

/// Every fixed cost with its effective status in a month
pub async fn list_fixed_costs_for_month(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Vec<FixedCostMonthStatus>>> {
    let service = FixedCostService::new(state.db);
    let statuses = service
        .list_for_month(current_user.0.user_id, &query.month)
        .await?;
    Ok(Json(statuses))
}

pub async fn list_fixed_cost_periods(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
) -> AppResult<Json<Vec<FixedCostPeriod>>> {
    let service = FixedCostService::new(state.db);
    let periods = service.list_periods(current_user.0.user_id, fixed_cost_id).await?;
    Ok(Json(periods))
}

/// Set a fixed cost's status for one month
pub async fn set_fixed_cost_period(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fixed_cost_id): Path<Uuid>,
    Json(input): Json<SetPeriodStatusInput>,
) -> AppResult<Json<FixedCostPeriod>> {
    let service = FixedCostService::new(state.db);
    let period = service
        .set_period_status(current_user.0.user_id, fixed_cost_id, input)
        .await?;
    Ok(Json(period))
}

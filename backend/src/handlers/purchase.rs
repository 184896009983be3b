//! HTTP handlers for purchase endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchase::{
    CreatePurchaseInput, ListPurchasesQuery, PurchaseService, UpdatePurchaseInput,
};
use crate::AppState;
use shared::{Purchase, PurchaseStats};

fn purchase_service(state: AppState) -> PurchaseService {
    PurchaseService::new(state.db, state.config.business.calendar())
}

pub async fn list_purchases(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPurchasesQuery>,
) -> AppResult<Json<Vec<Purchase>>> {
    let purchases = purchase_service(state)
        .list_purchases(current_user.0.user_id, query)
        .await?;
    Ok(Json(purchases))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<Json<Purchase>> {
    let purchase = purchase_service(state)
        .create_purchase(current_user.0.user_id, input)
        .await?;
    Ok(Json(purchase))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<Purchase>> {
    let purchase = purchase_service(state)
        .get_purchase(current_user.0.user_id, purchase_id)
        .await?;
    Ok(Json(purchase))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseInput>,
) -> AppResult<Json<Purchase>> {
    let purchase = purchase_service(state)
        .update_purchase(current_user.0.user_id, purchase_id, input)
        .await?;
    Ok(Json(purchase))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    purchase_service(state)
        .delete_purchase(current_user.0.user_id, purchase_id)
        .await?;
    Ok(Json(()))
}

pub async fn get_purchase_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<PurchaseStats>> {
    let stats = purchase_service(state).stats(current_user.0.user_id).await?;
    Ok(Json(stats))
}

pub async fn list_purchase_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<String>>> {
    let categories = purchase_service(state).categories(current_user.0.user_id).await?;
    Ok(Json(categories))
}

//! HTTP handlers for ingredient endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ingredient::{
    CreateIngredientInput, IngredientService, StockChangeInput, UpdateIngredientInput,
};
use crate::AppState;
use shared::Ingredient;

pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Ingredient>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.list_ingredients(current_user.0.user_id).await?;
    Ok(Json(ingredients))
}

/// Ingredients at or below their minimum stock
pub async fn list_low_stock_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Ingredient>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.low_stock(current_user.0.user_id).await?;
    Ok(Json(ingredients))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.create_ingredient(current_user.0.user_id, input).await?;
    Ok(Json(ingredient))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.get_ingredient(current_user.0.user_id, ingredient_id).await?;
    Ok(Json(ingredient))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service
        .update_ingredient(current_user.0.user_id, ingredient_id, input)
        .await?;
    Ok(Json(ingredient))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = IngredientService::new(state.db);
    service.delete_ingredient(current_user.0.user_id, ingredient_id).await?;
    Ok(Json(()))
}

/// Add purchased quantity to stock
pub async fn add_ingredient_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<StockChangeInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service
        .add_stock(current_user.0.user_id, ingredient_id, input)
        .await?;
    Ok(Json(ingredient))
}

/// Remove quantity from stock
pub async fn reduce_ingredient_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<StockChangeInput>,
) -> AppResult<Json<Ingredient>> {
    let service = IngredientService::new(state.db);
    let ingredient = service
        .reduce_stock(current_user.0.user_id, ingredient_id, input)
        .await?;
    Ok(Json(ingredient))
}

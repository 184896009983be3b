//! HTTP handlers for products, bundle conversions and fixed-cost pricing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::apportionment::{
    ApportionmentService, FixedCostAllocationQuery, FixedCostAllocationReport, ManualAllocationInput,
    ManualAllocationReport,
};
use crate::services::product::{
    CreateBundleInput, CreateProductInput, ListProductsQuery, ProductService, UpdateProductInput,
};
use crate::AppState;
use shared::{BundleConversion, Product, ProductDetail};

fn product_service(state: AppState) -> ProductService {
    ProductService::new(state.db, state.config.business.default_profit_margin)
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = product_service(state)
        .list_products(current_user.0.user_id, query)
        .await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ProductDetail>> {
    let product = product_service(state)
        .create_product(current_user.0.user_id, input)
        .await?;
    Ok(Json(product))
}

/// Get a product with its recipe
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductDetail>> {
    let product = product_service(state)
        .get_product(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ProductDetail>> {
    let product = product_service(state)
        .update_product(current_user.0.user_id, product_id, input)
        .await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    product_service(state)
        .delete_product(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(()))
}

/// Fixed cost per unit and recommended price of a product
pub async fn get_fixed_cost_allocation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<FixedCostAllocationQuery>,
) -> AppResult<Json<FixedCostAllocationReport>> {
    let service = ApportionmentService::new(state.db, &state.config.business);
    let report = service
        .fixed_cost_allocation(current_user.0.user_id, product_id, query)
        .await?;
    Ok(Json(report))
}

/// Apportion fixed costs by entered quantities
pub async fn calculate_fixed_costs_manual(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ManualAllocationInput>,
) -> AppResult<Json<ManualAllocationReport>> {
    let service = ApportionmentService::new(state.db, &state.config.business);
    let report = service.manual_allocation(current_user.0.user_id, input).await?;
    Ok(Json(report))
}

/// List bundle conversions
pub async fn list_bundles(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<BundleConversion>>> {
    let bundles = product_service(state).list_bundles(current_user.0.user_id).await?;
    Ok(Json(bundles))
}

/// Create a bundle conversion
pub async fn create_bundle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBundleInput>,
) -> AppResult<Json<BundleConversion>> {
    let bundle = product_service(state)
        .create_bundle(current_user.0.user_id, input)
        .await?;
    Ok(Json(bundle))
}

/// Delete a bundle conversion
pub async fn delete_bundle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(bundle_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    product_service(state)
        .delete_bundle(current_user.0.user_id, bundle_id)
        .await?;
    Ok(Json(()))
}

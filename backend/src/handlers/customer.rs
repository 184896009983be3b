//! HTTP handlers for customer endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::customer::{CreateCustomerInput, CustomerSales, CustomerService, UpdateCustomerInput};
use crate::AppState;
use shared::{Customer, CustomerSummary};

/// List customers with their sales aggregates
pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<CustomerSummary>>> {
    let service = CustomerService::new(state.db);
    let customers = service.list_customers(current_user.0.user_id).await?;
    Ok(Json(customers))
}

/// Create a customer
pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db);
    let customer = service.create_customer(current_user.0.user_id, input).await?;
    Ok(Json(customer))
}

/// Get a customer by ID
pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db);
    let customer = service.get_customer(current_user.0.user_id, customer_id).await?;
    Ok(Json(customer))
}

/// Update a customer
pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db);
    let customer = service
        .update_customer(current_user.0.user_id, customer_id, input)
        .await?;
    Ok(Json(customer))
}

/// Delete a customer who owes nothing
pub async fn delete_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CustomerService::new(state.db);
    service.delete_customer(current_user.0.user_id, customer_id).await?;
    Ok(Json(()))
}

/// A customer's sales, newest first
pub async fn get_customer_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerSales>> {
    let service = CustomerService::new(state.db);
    let sales = service.customer_sales(current_user.0.user_id, customer_id).await?;
    Ok(Json(sales))
}

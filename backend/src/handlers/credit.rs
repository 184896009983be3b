//! HTTP handlers for credit sales and payments

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::credit::{
    CreditPaymentInput, CreditPaymentsQuery, CreditSalesOverview, CreditSalesQuery, CreditService,
    PaymentReceipt, ReconcileInput, ReconcileReport, SaleCreditPaymentInput,
};
use crate::AppState;
use shared::{CreditPayment, CreditPaymentEntry, PaginatedResponse};

fn credit_service(state: AppState) -> CreditService {
    CreditService::new(state.db, state.config.business.max_conflict_retries)
}

/// Outstanding credit sales grouped by customer
pub async fn list_credit_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CreditSalesQuery>,
) -> AppResult<Json<CreditSalesOverview>> {
    let overview = credit_service(state)
        .list_credit_sales(current_user.0.user_id, query)
        .await?;
    Ok(Json(overview))
}

/// Apply a customer payment to their oldest credit sales first
pub async fn register_credit_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreditPaymentInput>,
) -> AppResult<Json<PaymentReceipt>> {
    let receipt = credit_service(state)
        .apply_credit_payment(current_user.0.user_id, input)
        .await?;
    Ok(Json(receipt))
}

/// Payment history, newest first
pub async fn list_credit_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CreditPaymentsQuery>,
) -> AppResult<Json<PaginatedResponse<CreditPaymentEntry>>> {
    let payments = credit_service(state)
        .list_credit_payments(current_user.0.user_id, query)
        .await?;
    Ok(Json(payments))
}

/// Payments recorded against one sale
pub async fn list_sale_credit_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Vec<CreditPayment>>> {
    let payments = credit_service(state)
        .sale_payments(current_user.0.user_id, sale_id)
        .await?;
    Ok(Json(payments))
}

/// Apply a payment to one sale
pub async fn register_sale_credit_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<SaleCreditPaymentInput>,
) -> AppResult<Json<PaymentReceipt>> {
    let receipt = credit_service(state)
        .apply_sale_credit_payment(current_user.0.user_id, sale_id, input)
        .await?;
    Ok(Json(receipt))
}

/// Check stored customer balances against their credit sales
pub async fn reconcile_credit_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReconcileInput>,
) -> AppResult<Json<ReconcileReport>> {
    let report = credit_service(state)
        .reconcile_credit_balances(current_user.0.user_id, input)
        .await?;
    Ok(Json(report))
}

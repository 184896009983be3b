//! Error handling for the Caja POS backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{LedgerError, Money};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    // Business rule errors
    #[error("No outstanding balance")]
    NoOutstandingBalance,

    #[error("Payment {amount} exceeds outstanding balance {outstanding}")]
    AmountExceedsBalance { amount: Money, outstanding: Money },

    #[error("Invalid profit margin: {0}")]
    InvalidMargin(Decimal),

    #[error("Cash session already open for {0}")]
    SessionAlreadyOpen(NaiveDate),

    #[error("No open cash session for {0}")]
    NoOpenSession(NaiveDate),

    #[error("Sale {0} cannot be reversed")]
    SaleNotReversible(Uuid),

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    // Concurrency errors
    #[error("Transient conflict: {0}")]
    TransientConflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn validation(field: impl Into<String>, message: String, message_es: String) -> Self {
        AppError::Validation {
            field: field.into(),
            message,
            message_es,
        }
    }

    /// Deadlock or serialization failure; the transaction may succeed if retried
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::DatabaseError(err) => matches!(sqlstate(err).as_deref(), Some("40P01") | Some("40001")),
            _ => false,
        }
    }
}

/// SQLSTATE of a database error, if any
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Name of the unique constraint a database error violated
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            Some(db_err.constraint().unwrap_or("unique").to_string())
        }
        _ => None,
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NonPositiveAmount { field } => AppError::validation(
                field,
                format!("{} must be greater than zero", field),
                format!("{} debe ser mayor que cero", field),
            ),
            LedgerError::NegativeAmount { field } => AppError::validation(
                field,
                format!("{} cannot be negative", field),
                format!("{} no puede ser negativo", field),
            ),
            LedgerError::PaidExceedsTotal { paid, total } => AppError::validation(
                "cash_received",
                format!("Amount paid {} exceeds the sale total {}", paid, total),
                format!("El monto pagado {} supera el total de la venta {}", paid, total),
            ),
            LedgerError::NoOutstandingBalance => AppError::NoOutstandingBalance,
            LedgerError::AmountExceedsBalance { amount, outstanding } => {
                AppError::AmountExceedsBalance { amount, outstanding }
            }
            LedgerError::InvalidMargin(margin) => AppError::InvalidMargin(margin),
            LedgerError::InvalidPeriod(reason) => AppError::validation(
                "period",
                format!("Invalid period: {}", reason),
                format!("Periodo inválido: {}", reason),
            ),
            LedgerError::InvalidLineItem { index, reason } => AppError::validation(
                format!("items[{}]", index),
                reason.clone(),
                format!("Ítem inválido: {}", reason),
            ),
            LedgerError::TotalsMismatch(reason) => AppError::validation(
                "total",
                reason.clone(),
                format!("Los totales no cuadran: {}", reason),
            ),
            LedgerError::SaleNotReversible(id) => AppError::SaleNotReversible(id),
            LedgerError::InvalidEnumValue { field, value } => AppError::validation(
                field,
                format!("Invalid value '{}' for {}", value, field),
                format!("Valor '{}' inválido para {}", value, field),
            ),
            LedgerError::InsufficientStock { available, requested } => {
                AppError::InsufficientStock { available, requested }
            }
            LedgerError::InsufficientCash { received, total } => AppError::validation(
                "cash_received",
                format!("Cash received {} is less than the total {}", received, total),
                format!("El efectivo recibido {} es menor que el total {}", received, total),
            ),
            LedgerError::SessionAlreadyOpen(date) => AppError::SessionAlreadyOpen(date),
            LedgerError::NoOpenSession(date) => AppError::NoOpenSession(date),
            LedgerError::DateOutOfRange(date) => AppError::validation(
                "date",
                format!("Date {} is outside the supported range", date),
                format!("La fecha {} está fuera del rango permitido", date),
            ),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_es: "Token inválido".to_string(),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_es } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Datos inválidos: {}", msg),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_es: format!("Ya existe un registro con este {}", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict { resource, message, message_es } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("{} no encontrado", resource),
                    field: None,
                },
            ),
            AppError::ProductNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "PRODUCT_NOT_FOUND".to_string(),
                    message_en: "Product not found".to_string(),
                    message_es: "Producto no encontrado".to_string(),
                    field: Some("product_id".to_string()),
                },
            ),
            AppError::NoOutstandingBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "NO_OUTSTANDING_BALANCE".to_string(),
                    message_en: "There are no pending credit sales to apply this payment to".to_string(),
                    message_es: "No hay ventas a crédito pendientes para aplicar este abono".to_string(),
                    field: None,
                },
            ),
            AppError::AmountExceedsBalance { amount, outstanding } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "AMOUNT_EXCEEDS_BALANCE".to_string(),
                    message_en: format!(
                        "Payment of {} exceeds the outstanding balance of {}",
                        amount, outstanding
                    ),
                    message_es: format!(
                        "El abono de {} supera el saldo pendiente de {}",
                        amount, outstanding
                    ),
                    field: Some("amount".to_string()),
                },
            ),
            AppError::InvalidMargin(margin) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_MARGIN".to_string(),
                    message_en: format!("Profit margin must be at least 0% and below 100%, got {}%", margin),
                    message_es: format!("El margen debe estar entre 0% y menos de 100%, se recibió {}%", margin),
                    field: Some("profit_margin".to_string()),
                },
            ),
            AppError::SessionAlreadyOpen(date) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "SESSION_ALREADY_OPEN".to_string(),
                    message_en: format!("The register is already open for {}", date),
                    message_es: format!("La caja ya está abierta para {}", date),
                    field: None,
                },
            ),
            AppError::NoOpenSession(date) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "NO_OPEN_SESSION".to_string(),
                    message_en: format!("There is no open register for {}", date),
                    message_es: format!("No hay una caja abierta para {}", date),
                    field: None,
                },
            ),
            AppError::SaleNotReversible(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "SALE_NOT_REVERSIBLE".to_string(),
                    message_en: "Only completed sales can be reversed".to_string(),
                    message_es: "Solo se pueden anular ventas completadas".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientStock { available, requested } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock: {} portions available, {} requested",
                        available, requested
                    ),
                    message_es: format!(
                        "Stock insuficiente: {} porciones disponibles, {} solicitadas",
                        available, requested
                    ),
                    field: Some("quantity".to_string()),
                },
            ),
            AppError::TransientConflict(_) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "TRANSIENT_CONFLICT".to_string(),
                    message_en: "The operation collided with a concurrent update, please retry".to_string(),
                    message_es: "La operación coincidió con otra actualización, intente de nuevo".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error en la base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Turn a `validator` failure into the first offending field
pub fn validation_errors(errors: validator::ValidationErrors) -> AppError {
    let field_errors = errors.field_errors();
    match field_errors.iter().next() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{} is invalid", field));
            AppError::Validation {
                field: field.to_string(),
                message: message.clone(),
                message_es: format!("Campo inválido: {}", message),
            }
        }
        None => AppError::ValidationError(errors.to_string()),
    }
}

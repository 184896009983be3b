//! Domain-rule failures raised by the pure ledger engines

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::money::Money;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{field} must be greater than zero")]
    NonPositiveAmount { field: &'static str },

    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },

    #[error("Paid amount {paid} exceeds total {total}")]
    PaidExceedsTotal { paid: Money, total: Money },

    #[error("No outstanding balance to apply a payment against")]
    NoOutstandingBalance,

    #[error("Payment {amount} exceeds outstanding balance {outstanding}")]
    AmountExceedsBalance { amount: Money, outstanding: Money },

    #[error("Profit margin must be at least 0% and below 100%, got {0}%")]
    InvalidMargin(rust_decimal::Decimal),

    #[error("Invalid reporting period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid line item {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    #[error("Sale totals do not add up: {0}")]
    TotalsMismatch(String),

    #[error("Sale {0} is not completed and cannot be reversed")]
    SaleNotReversible(Uuid),

    #[error("Invalid value for {field}: {value}")]
    InvalidEnumValue { field: &'static str, value: String },

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Cash received {received} is less than the sale total {total}")]
    InsufficientCash { received: Money, total: Money },

    #[error("A cash session is already open for {0}")]
    SessionAlreadyOpen(NaiveDate),

    #[error("There is no open cash session for {0}")]
    NoOpenSession(NaiveDate),

    #[error("Date {0} is outside the supported range")]
    DateOutOfRange(NaiveDate),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

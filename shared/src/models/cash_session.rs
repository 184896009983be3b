//! Cash register session ("caja") models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// One business day's register session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub bank_balance: Money,
    pub wallet_primary_balance: Money,
    pub wallet_secondary_balance: Money,
    pub cash_balance: Money,
    /// Sum of the opening components while open; frozen closing balance once closed
    pub total_balance: Money,
    pub is_closed: bool,
    pub notes: Option<String>,
    pub session_type: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub closing: Option<ClosingFigures>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Day totals written once when a session closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingFigures {
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub total_sales: Money,
    pub expenses: Money,
    pub profit: Money,
}

/// Live or frozen view of today's register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashSessionStatus {
    pub date: NaiveDate,
    pub is_open: bool,
    pub is_closed: bool,
    pub session: Option<CashSession>,
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub cash_total: Money,
    pub card_total: Money,
    pub transfer_total: Money,
    pub total_sales: Money,
    pub purchases: Money,
    pub fixed_costs: Money,
    pub expenses: Money,
    pub profit: Money,
}

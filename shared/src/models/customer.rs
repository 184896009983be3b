//! Customer models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// A customer, identified per tenant by document number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Running total owed; equals the outstanding balance of the customer's completed sales
    pub credit_balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn has_outstanding_credit(&self) -> bool {
        !self.credit_balance.is_zero()
    }
}

/// Customer listing row with sales aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub sales_count: i64,
    pub total_spent: Money,
    pub pending_credits: Money,
}

/// Contact data carried by a sale; used to find or create the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    pub document: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

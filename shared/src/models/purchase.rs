//! Purchase (expense) models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CategoryTotal;
use crate::money::Money;

/// An expense paid out of the business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Money,
    /// Business date of the expense
    pub date: NaiveDate,
    pub category: String,
    pub concept: String,
    pub notes: Option<String>,
    pub fixed_cost_id: Option<Uuid>,
    pub is_partial_payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseStats {
    pub total_purchases: i64,
    pub total_amount: Money,
    pub today_amount: Money,
    pub today_count: i64,
    pub by_category: Vec<CategoryTotal>,
}

pub fn purchase_stats(purchases: &[Purchase], today: NaiveDate) -> PurchaseStats {
    let mut stats = PurchaseStats::default();

    for purchase in purchases {
        stats.total_purchases += 1;
        stats.total_amount += purchase.amount;
        if purchase.date == today {
            stats.today_amount += purchase.amount;
            stats.today_count += 1;
        }

        match stats
            .by_category
            .iter_mut()
            .find(|c| c.category == purchase.category)
        {
            Some(entry) => entry.total += purchase.amount,
            None => stats.by_category.push(CategoryTotal {
                category: purchase.category.clone(),
                total: purchase.amount,
            }),
        }
    }

    stats
}

//! Fixed cost definitions and their per-month overrides

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Biweekly => "BIWEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Quarterly => "QUARTERLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "BIWEEKLY" => Ok(Frequency::Biweekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "QUARTERLY" => Ok(Frequency::Quarterly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(LedgerError::InvalidEnumValue {
                field: "frequency",
                value: other.to_string(),
            }),
        }
    }
}

/// A recurring operating expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: Money,
    pub description: Option<String>,
    pub frequency: Frequency,
    /// Day of the month the cost falls due
    pub due_date: Option<i32>,
    pub category: Option<String>,
    pub is_active: bool,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FixedCost {
    /// Counts toward period totals and daily expenses
    pub fn is_active_and_paid(&self) -> bool {
        self.is_active && self.is_paid
    }
}

/// Month-keyed override of a fixed cost's status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCostPeriod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fixed_cost_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub is_active: bool,
    pub is_paid: bool,
    pub partial_amount: Option<Money>,
    pub paid_amount: Option<Money>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fixed cost as it stands in one month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCostMonthStatus {
    #[serde(flatten)]
    pub fixed_cost: FixedCost,
    pub month: String,
    pub effective_is_active: bool,
    pub effective_is_paid: bool,
    pub partial_amount: Option<Money>,
    pub paid_amount: Option<Money>,
    pub period_notes: Option<String>,
    pub has_override: bool,
}

/// Resolve a definition against its optional override for `month`
pub fn month_status(
    fixed_cost: FixedCost,
    period: Option<&FixedCostPeriod>,
    month: &str,
) -> FixedCostMonthStatus {
    match period {
        Some(p) => FixedCostMonthStatus {
            month: month.to_string(),
            effective_is_active: p.is_active,
            effective_is_paid: p.is_paid,
            partial_amount: p.partial_amount,
            paid_amount: p.paid_amount,
            period_notes: p.notes.clone(),
            has_override: true,
            fixed_cost,
        },
        None => FixedCostMonthStatus {
            month: month.to_string(),
            effective_is_active: fixed_cost.is_active,
            effective_is_paid: fixed_cost.is_paid,
            partial_amount: None,
            paid_amount: None,
            period_notes: None,
            has_override: false,
            fixed_cost,
        },
    }
}

/// Totals over active fixed costs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCostStats {
    pub total_amount: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,
    pub total_costs: i64,
    pub paid_costs: i64,
    pub pending_costs: i64,
    pub categories: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
}

pub fn fixed_cost_stats(costs: &[FixedCost]) -> FixedCostStats {
    let mut stats = FixedCostStats::default();

    for cost in costs.iter().filter(|c| c.is_active) {
        stats.total_amount += cost.amount;
        stats.total_costs += 1;
        if cost.is_paid {
            stats.paid_amount += cost.amount;
            stats.paid_costs += 1;
        } else {
            stats.pending_amount += cost.amount;
            stats.pending_costs += 1;
        }

        if let Some(category) = &cost.category {
            match stats.categories.iter_mut().find(|c| &c.category == category) {
                Some(entry) => entry.total += cost.amount,
                None => stats.categories.push(CategoryTotal {
                    category: category.clone(),
                    total: cost.amount,
                }),
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(amount: i64, active: bool, paid: bool, category: Option<&str>) -> FixedCost {
        FixedCost {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: "Rent".to_string(),
            amount: Money::from_minor(amount),
            description: None,
            frequency: Frequency::Monthly,
            due_date: Some(5),
            category: category.map(str::to_string),
            is_active: active,
            is_paid: paid,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_stats_ignore_inactive_costs() {
        let costs = vec![
            cost(100_000, true, true, Some("rent")),
            cost(50_000, true, false, Some("utilities")),
            cost(20_000, true, false, Some("utilities")),
            cost(999_999, false, true, Some("rent")),
        ];
        let stats = fixed_cost_stats(&costs);
        assert_eq!(stats.total_amount, Money::from_minor(170_000));
        assert_eq!(stats.paid_amount, Money::from_minor(100_000));
        assert_eq!(stats.pending_costs, 2);
        assert_eq!(stats.categories.len(), 2);
        assert_eq!(stats.categories[1].total, Money::from_minor(70_000));
    }

    #[test]
    fn test_month_status_prefers_override() {
        let definition = cost(100_000, true, false, None);
        let period = FixedCostPeriod {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            fixed_cost_id: definition.id,
            month: "2024-03".to_string(),
            is_active: true,
            is_paid: true,
            partial_amount: None,
            paid_amount: Some(Money::from_minor(100_000)),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let status = month_status(definition.clone(), Some(&period), "2024-03");
        assert!(status.effective_is_paid);
        assert!(status.has_override);

        let plain = month_status(definition, None, "2024-04");
        assert!(!plain.effective_is_paid);
    }
}

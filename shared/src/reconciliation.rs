//! Cash session reconciler: the figures of one register day and its open/close rules

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CashSession, ClosingFigures};
use crate::money::Money;

/// Component balances declared when the register opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalances {
    pub bank: Money,
    pub wallet_primary: Money,
    pub wallet_secondary: Money,
    pub cash: Money,
}

impl OpeningBalances {
    pub fn total(&self) -> Money {
        self.bank + self.wallet_primary + self.wallet_secondary + self.cash
    }

    pub fn validate(&self) -> LedgerResult<()> {
        for (field, value) in [
            ("bank_balance", self.bank),
            ("wallet_primary_balance", self.wallet_primary),
            ("wallet_secondary_balance", self.wallet_secondary),
            ("cash_balance", self.cash),
        ] {
            if value.is_negative() {
                return Err(LedgerError::NegativeAmount { field });
            }
        }
        Ok(())
    }
}

/// Aggregates of one business day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Cash sales plus the up-front part of combined sales
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    /// Totals of every completed sale of the day
    pub total_sales: Money,
    pub purchases: Money,
    /// Active fixed costs marked paid during the day
    pub paid_fixed_costs: Money,
}

impl DailyActivity {
    pub fn expenses(&self) -> Money {
        self.purchases + self.paid_fixed_costs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFigures {
    pub opening_balance: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub total_sales: Money,
    pub purchases: Money,
    pub paid_fixed_costs: Money,
    pub expenses: Money,
    pub closing_balance: Money,
    pub profit: Money,
}

impl SessionFigures {
    pub fn closing(&self) -> ClosingFigures {
        ClosingFigures {
            cash_sales: self.cash_sales,
            card_sales: self.card_sales,
            transfer_sales: self.transfer_sales,
            total_sales: self.total_sales,
            expenses: self.expenses,
            profit: self.profit,
        }
    }
}

/// closing = opening cash + cash sales - expenses; profit = total sales - expenses
pub fn compute_figures(opening_cash: Money, activity: &DailyActivity) -> SessionFigures {
    let expenses = activity.expenses();
    SessionFigures {
        opening_balance: opening_cash,
        cash_sales: activity.cash_sales,
        card_sales: activity.card_sales,
        transfer_sales: activity.transfer_sales,
        total_sales: activity.total_sales,
        purchases: activity.purchases,
        paid_fixed_costs: activity.paid_fixed_costs,
        expenses,
        closing_balance: opening_cash + activity.cash_sales - expenses,
        profit: activity.total_sales - expenses,
    }
}

/// Opening is allowed only when no unclosed session exists for the day
pub fn ensure_can_open(date: NaiveDate, existing: Option<&CashSession>) -> LedgerResult<()> {
    match existing {
        Some(session) if !session.is_closed && session.date == date => {
            Err(LedgerError::SessionAlreadyOpen(date))
        }
        _ => Ok(()),
    }
}

/// Closing needs the day's unclosed session
pub fn ensure_can_close(date: NaiveDate, session: Option<&CashSession>) -> LedgerResult<&CashSession> {
    match session {
        Some(s) if !s.is_closed && s.date == date => Ok(s),
        _ => Err(LedgerError::NoOpenSession(date)),
    }
}

/// Figures reported for a session: frozen for a closed session, otherwise
/// recomputed from the live activity.
pub fn session_figures(session: &CashSession, live: &DailyActivity) -> SessionFigures {
    match (session.is_closed, session.closing) {
        (true, Some(frozen)) => SessionFigures {
            opening_balance: session.cash_balance,
            cash_sales: frozen.cash_sales,
            card_sales: frozen.card_sales,
            transfer_sales: frozen.transfer_sales,
            total_sales: frozen.total_sales,
            purchases: live.purchases,
            paid_fixed_costs: live.paid_fixed_costs,
            expenses: frozen.expenses,
            closing_balance: session.total_balance,
            profit: frozen.profit,
        },
        _ => compute_figures(session.cash_balance, live),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn session(date: NaiveDate, is_closed: bool) -> CashSession {
        CashSession {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date,
            bank_balance: Money::ZERO,
            wallet_primary_balance: Money::ZERO,
            wallet_secondary_balance: Money::ZERO,
            cash_balance: Money::from_minor(10_000),
            total_balance: Money::from_minor(10_000),
            is_closed,
            notes: None,
            session_type: "manual".to_string(),
            closed_at: None,
            closing: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_opening_total_and_validation() {
        let balances = OpeningBalances {
            bank: Money::from_minor(100),
            wallet_primary: Money::from_minor(200),
            wallet_secondary: Money::from_minor(300),
            cash: Money::from_minor(400),
        };
        assert_eq!(balances.total(), Money::from_minor(1000));
        assert!(balances.validate().is_ok());

        let negative = OpeningBalances { cash: Money::from_minor(-1), ..balances };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_transitions() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let open = session(today, false);
        assert_eq!(ensure_can_open(today, Some(&open)), Err(LedgerError::SessionAlreadyOpen(today)));
        assert!(ensure_can_open(today, Some(&session(today, true))).is_ok());
        assert!(ensure_can_open(today, None).is_ok());

        assert!(ensure_can_close(today, Some(&open)).is_ok());
        assert_eq!(ensure_can_close(today, None).unwrap_err(), LedgerError::NoOpenSession(today));
        let yesterday = today.pred_opt().unwrap();
        assert!(ensure_can_close(today, Some(&session(yesterday, false))).is_err());
    }
}

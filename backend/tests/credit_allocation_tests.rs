//! Credit allocation tests
//!
//! Tests for collecting customer credit including:
//! - Payments are distributed oldest sale first
//! - Allocation conserves the paid amount
//! - Overpayments and empty ledgers are rejected
//! - Stored balances are checked against outstanding sales

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    balance_discrepancy, plan_fifo_allocation, plan_single_sale_allocation, total_outstanding,
    LedgerError, Money, OutstandingSale,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn money(s: &str) -> Money {
    Money::new(dec(s))
}

/// Outstanding sales created one day apart, in the given order
fn ledger(balances: &[&str]) -> Vec<OutstandingSale> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    balances
        .iter()
        .enumerate()
        .map(|(i, b)| OutstandingSale {
            sale_id: Uuid::new_v4(),
            created_at: start + Duration::days(i as i64),
            remaining_balance: money(b),
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 120 against [100, 50, 200] clears the first sale and part of the second
    #[test]
    fn test_fifo_partial_second_sale() {
        let sales = ledger(&["100", "50", "200"]);
        let plan = plan_fifo_allocation(&sales, money("120")).unwrap();

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].sale_id, sales[0].sale_id);
        assert_eq!(plan.allocations[0].amount_applied, money("100"));
        assert_eq!(plan.allocations[0].remaining_balance, Money::ZERO);
        assert_eq!(plan.allocations[1].sale_id, sales[1].sale_id);
        assert_eq!(plan.allocations[1].amount_applied, money("20"));
        assert_eq!(plan.allocations[1].remaining_balance, money("30"));

        assert_eq!(plan.outstanding_before, money("350"));
        assert_eq!(plan.outstanding_after, money("230"));
    }

    /// Input order does not matter, only creation time
    #[test]
    fn test_fifo_orders_by_created_at() {
        let mut sales = ledger(&["100", "50", "200"]);
        let oldest = sales[0].sale_id;
        sales.reverse();

        let plan = plan_fifo_allocation(&sales, money("10")).unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].sale_id, oldest);
    }

    /// Sales created at the same instant are ordered by id
    #[test]
    fn test_fifo_tie_broken_by_id() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut a = Uuid::new_v4();
        let mut b = Uuid::new_v4();
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }
        let sales = vec![
            OutstandingSale { sale_id: b, created_at: at, remaining_balance: money("10") },
            OutstandingSale { sale_id: a, created_at: at, remaining_balance: money("10") },
        ];

        let plan = plan_fifo_allocation(&sales, money("5")).unwrap();
        assert_eq!(plan.allocations[0].sale_id, a);
    }

    /// Exact payoff leaves nothing outstanding
    #[test]
    fn test_fifo_exact_payoff() {
        let sales = ledger(&["100", "50", "200"]);
        let plan = plan_fifo_allocation(&sales, money("350")).unwrap();

        assert_eq!(plan.allocations.len(), 3);
        assert!(plan.allocations.iter().all(|a| a.remaining_balance.is_zero()));
        assert_eq!(plan.outstanding_after, Money::ZERO);
    }

    /// Paying more than owed is rejected
    #[test]
    fn test_overpayment_rejected() {
        let sales = ledger(&["100", "50"]);
        let err = plan_fifo_allocation(&sales, money("150.01")).unwrap_err();

        assert_eq!(
            err,
            LedgerError::AmountExceedsBalance {
                amount: money("150.01"),
                outstanding: money("150"),
            }
        );
    }

    /// Nothing owed means nothing to pay
    #[test]
    fn test_no_outstanding_balance() {
        let sales = ledger(&["0", "0"]);
        assert_eq!(
            plan_fifo_allocation(&sales, money("1")).unwrap_err(),
            LedgerError::NoOutstandingBalance
        );
        assert_eq!(
            plan_fifo_allocation(&[], money("1")).unwrap_err(),
            LedgerError::NoOutstandingBalance
        );
    }

    /// Zero and negative payments are rejected
    #[test]
    fn test_non_positive_amount_rejected() {
        let sales = ledger(&["100"]);
        assert!(matches!(
            plan_fifo_allocation(&sales, Money::ZERO),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            plan_fifo_allocation(&sales, money("-5")),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    /// Settled sales are skipped
    #[test]
    fn test_settled_sales_skipped() {
        let sales = ledger(&["0", "40"]);
        let plan = plan_fifo_allocation(&sales, money("40")).unwrap();

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].sale_id, sales[1].sale_id);
    }

    /// A payment against one sale is capped by that sale alone
    #[test]
    fn test_single_sale_allocation() {
        let sales = ledger(&["80"]);
        let plan = plan_single_sale_allocation(&sales[0], money("30")).unwrap();
        assert_eq!(plan.allocations[0].remaining_balance, money("50"));

        assert!(plan_single_sale_allocation(&sales[0], money("80.50")).is_err());
    }

    #[test]
    fn test_total_outstanding_ignores_settled() {
        let sales = ledger(&["10.50", "0", "4.25"]);
        assert_eq!(total_outstanding(&sales), money("14.75"));
    }

    /// Drift within one cent is tolerated
    #[test]
    fn test_balance_discrepancy_tolerance() {
        let id = Uuid::new_v4();
        assert!(balance_discrepancy(id, "123", "Ana", money("100.01"), money("100")).is_none());

        let found = balance_discrepancy(id, "123", "Ana", money("120"), money("100")).unwrap();
        assert_eq!(found.difference, money("20"));
        assert_eq!(found.computed_balance, money("100"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Balances in cents, some of them already settled
    fn balances_strategy() -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(prop_oneof![Just(0i64), 1i64..500_000], 1..12)
    }

    fn outstanding(cents: &[i64]) -> Vec<OutstandingSale> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        cents
            .iter()
            .enumerate()
            .map(|(i, c)| OutstandingSale {
                sale_id: Uuid::new_v4(),
                created_at: start + Duration::hours(i as i64),
                remaining_balance: Money::from_minor(*c),
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Applied amounts sum to the payment and balances drop by the same amount
        #[test]
        fn prop_allocation_conserves_amount(cents in balances_strategy(), pick in 0.0f64..1.0) {
            let sales = outstanding(&cents);
            let owed = total_outstanding(&sales);
            prop_assume!(owed.is_positive());

            let amount_minor = ((owed.minor_units() as f64 * pick) as i64).max(1);
            let amount = Money::from_minor(amount_minor);
            let plan = plan_fifo_allocation(&sales, amount).unwrap();

            let applied: Money = plan.allocations.iter().map(|a| a.amount_applied).sum();
            prop_assert_eq!(applied, amount);
            prop_assert_eq!(plan.outstanding_before - plan.outstanding_after, amount);

            for a in &plan.allocations {
                prop_assert!(a.amount_applied.is_positive());
                prop_assert!(a.amount_applied <= a.previous_balance);
                prop_assert_eq!(a.previous_balance - a.amount_applied, a.remaining_balance);
                prop_assert!(!a.remaining_balance.is_negative());
            }
        }

        /// Only the last touched sale may be left partially paid
        #[test]
        fn prop_fifo_settles_older_sales_first(cents in balances_strategy(), pick in 0.0f64..1.0) {
            let sales = outstanding(&cents);
            let owed = total_outstanding(&sales);
            prop_assume!(owed.is_positive());

            let amount = Money::from_minor(((owed.minor_units() as f64 * pick) as i64).max(1));
            let plan = plan_fifo_allocation(&sales, amount).unwrap();

            let (last, earlier) = plan.allocations.split_last().unwrap();
            for a in earlier {
                prop_assert!(a.remaining_balance.is_zero());
            }
            prop_assert!(last.amount_applied.is_positive());

            let times: Vec<_> = plan
                .allocations
                .iter()
                .map(|a| sales.iter().find(|s| s.sale_id == a.sale_id).unwrap().created_at)
                .collect();
            prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }

        /// Anything above the outstanding total is rejected
        #[test]
        fn prop_overpayment_always_rejected(cents in balances_strategy(), extra in 1i64..100_000) {
            let sales = outstanding(&cents);
            let owed = total_outstanding(&sales);
            prop_assume!(owed.is_positive());

            let result = plan_fifo_allocation(&sales, owed + Money::from_minor(extra));
            let is_exceeds_balance = matches!(result, Err(LedgerError::AmountExceedsBalance { .. }));
            prop_assert!(is_exceeds_balance);
        }
    }
}

//! Sale recording and reversal tests
//!
//! Tests for the sale ledger including:
//! - Settlement of every payment method
//! - Header totals checked against line items
//! - Reversal restores stock and releases only outstanding credit

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    check_totals, payment_breakdown, plan_reversal, settle_sale, split_payment, stock_decrements,
    LedgerError, Money, PaymentMethod, Sale, SaleLineItem, SaleStatus, SaleTotals,
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

fn line(product_id: Uuid, quantity: i32, price: &str) -> SaleLineItem {
    SaleLineItem {
        product_id,
        quantity,
        unit_price: money(price),
    }
}

fn sale(method: PaymentMethod, total: &str, remaining: &str, items: Vec<SaleLineItem>) -> Sale {
    let now = Utc::now();
    Sale {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        customer_id: Some(Uuid::new_v4()),
        customer_name: "Maria Lopez".to_string(),
        customer_document: "1020304050".to_string(),
        customer_phone: None,
        customer_email: None,
        items,
        subtotal: money(total),
        tax: Money::ZERO,
        discount: Money::ZERO,
        total: money(total),
        payment_method: method,
        cash_received: money(total) - money(remaining),
        change_amount: Money::ZERO,
        remaining_balance: money(remaining),
        transaction_number: None,
        status: SaleStatus::Completed,
        sale_date: Some(now.date_naive()),
        reversal_reason: None,
        reversed_at: None,
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Cash gives change and leaves no debt
    #[test]
    fn test_settle_cash_with_change() {
        let s = settle_sale(PaymentMethod::Cash, money("45.50"), Some(money("50"))).unwrap();
        assert_eq!(s.change_amount, money("4.50"));
        assert_eq!(s.remaining_balance, Money::ZERO);
        assert_eq!(s.credit_increment, Money::ZERO);
    }

    #[test]
    fn test_settle_cash_insufficient() {
        let err = settle_sale(PaymentMethod::Cash, money("45.50"), Some(money("40"))).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientCash {
                received: money("40"),
                total: money("45.50"),
            }
        );
    }

    /// A credit sale is fully owed
    #[test]
    fn test_settle_credit() {
        let s = settle_sale(PaymentMethod::Credit, money("80"), None).unwrap();
        assert_eq!(s.cash_received, Money::ZERO);
        assert_eq!(s.remaining_balance, money("80"));
        assert_eq!(s.credit_increment, money("80"));
    }

    /// A combined sale owes what was not paid up front
    #[test]
    fn test_settle_combined() {
        let s = settle_sale(PaymentMethod::Combined, money("100"), Some(money("35.25"))).unwrap();
        assert_eq!(s.cash_received, money("35.25"));
        assert_eq!(s.remaining_balance, money("64.75"));

        assert!(matches!(
            settle_sale(PaymentMethod::Combined, money("100"), Some(money("100.01"))),
            Err(LedgerError::PaidExceedsTotal { .. })
        ));
    }

    #[test]
    fn test_check_totals() {
        let p = Uuid::new_v4();
        let items = vec![line(p, 2, "10.00"), line(Uuid::new_v4(), 1, "5.50")];
        let ok = SaleTotals {
            subtotal: money("25.50"),
            tax: money("2.00"),
            discount: money("1.50"),
            total: money("26.00"),
        };
        assert!(check_totals(&items, &ok).is_ok());

        let wrong_total = SaleTotals { total: money("27.00"), ..ok };
        assert!(matches!(check_totals(&items, &wrong_total), Err(LedgerError::TotalsMismatch(_))));

        let wrong_subtotal = SaleTotals { subtotal: money("20"), ..ok };
        assert!(check_totals(&items, &wrong_subtotal).is_err());
    }

    #[test]
    fn test_check_totals_rejects_bad_lines() {
        let totals = SaleTotals {
            subtotal: Money::ZERO,
            tax: Money::ZERO,
            discount: Money::ZERO,
            total: Money::ZERO,
        };
        assert!(check_totals(&[], &totals).is_err());
        assert!(matches!(
            check_totals(&[line(Uuid::new_v4(), 0, "1")], &totals),
            Err(LedgerError::InvalidLineItem { index: 0, .. })
        ));
    }

    /// Reversal releases the remaining credit and returns every unit
    #[test]
    fn test_reversal_releases_remaining() {
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let s = sale(
            PaymentMethod::Combined,
            "100",
            "60",
            vec![line(p, 2, "20"), line(q, 1, "40"), line(p, 1, "20")],
        );

        let plan = plan_reversal(&s).unwrap();
        assert_eq!(plan.credit_release, money("60"));

        let mut expected = vec![(p, 3), (q, 1)];
        expected.sort();
        assert_eq!(plan.stock_restorations, expected);
    }

    /// Partly collected credit only releases what is still owed
    #[test]
    fn test_reversal_after_partial_collection() {
        let s = sale(PaymentMethod::Credit, "80", "30", vec![line(Uuid::new_v4(), 4, "20")]);
        assert_eq!(plan_reversal(&s).unwrap().credit_release, money("30"));
    }

    #[test]
    fn test_reversal_of_cash_sale_releases_nothing() {
        let s = sale(PaymentMethod::Cash, "10", "0", vec![line(Uuid::new_v4(), 1, "10")]);
        assert_eq!(plan_reversal(&s).unwrap().credit_release, Money::ZERO);
    }

    /// A sale is reversed at most once
    #[test]
    fn test_reversal_rejects_reversed_sale() {
        let mut s = sale(PaymentMethod::Cash, "10", "0", vec![line(Uuid::new_v4(), 1, "10")]);
        s.status = SaleStatus::Reversed;
        assert_eq!(plan_reversal(&s).unwrap_err(), LedgerError::SaleNotReversible(s.id));
    }

    /// Repeated lines of one product cannot overflow its unit count
    #[test]
    fn test_combined_quantity_overflow_is_rejected() {
        let p = Uuid::new_v4();
        let items = vec![line(p, i32::MAX, "0"), line(p, i32::MAX, "0")];
        let totals = SaleTotals {
            subtotal: Money::ZERO,
            tax: Money::ZERO,
            discount: Money::ZERO,
            total: Money::ZERO,
        };
        assert!(check_totals(&items, &totals).is_ok());
        assert!(matches!(
            stock_decrements(&items),
            Err(LedgerError::InvalidLineItem { index: 1, .. })
        ));

        let s = sale(PaymentMethod::Cash, "0", "0", items);
        assert!(matches!(
            plan_reversal(&s),
            Err(LedgerError::InvalidLineItem { index: 1, .. })
        ));
    }

    #[test]
    fn test_payment_breakdown() {
        let combined = payment_breakdown(PaymentMethod::Combined, money("100"), money("40"), money("60"));
        assert_eq!(combined.cash_amount, money("40"));
        assert_eq!(combined.credit_amount, money("60"));

        let credit = payment_breakdown(PaymentMethod::Credit, money("100"), Money::ZERO, money("100"));
        assert_eq!(credit.cash_amount, Money::ZERO);
        assert_eq!(credit.credit_amount, money("100"));

        let card = payment_breakdown(PaymentMethod::Card, money("100"), money("100"), Money::ZERO);
        assert_eq!(card.credit_amount, Money::ZERO);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::from_str("combined").unwrap(), PaymentMethod::Combined);
        assert!(PaymentMethod::from_str("cheque").is_err());
        assert_eq!(SaleStatus::from_str("REVERSED").unwrap(), SaleStatus::Reversed);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn items_strategy() -> impl Strategy<Value = Vec<SaleLineItem>> {
        let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        prop::collection::vec((0usize..4, 1i32..20, 0i64..100_000), 1..10).prop_map(move |lines| {
            lines
                .into_iter()
                .map(|(p, quantity, cents)| SaleLineItem {
                    product_id: products[p],
                    quantity,
                    unit_price: Money::from_minor(cents),
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Cash and credit parts always add up to the total
        #[test]
        fn prop_split_is_exact(total in 0i64..10_000_000, pick in 0.0f64..=1.0) {
            let total = Money::from_minor(total);
            let paid = Money::from_minor((total.minor_units() as f64 * pick) as i64);
            let split = split_payment(total, paid).unwrap();

            prop_assert_eq!(split.total(), total);
            prop_assert!(!split.credit.is_negative());
        }

        /// Reversal returns exactly the decremented units
        #[test]
        fn prop_reversal_mirrors_sale(items in items_strategy()) {
            let decrements = stock_decrements(&items).unwrap();
            let s = sale(PaymentMethod::Cash, "1", "0", items.clone());
            let plan = plan_reversal(&s).unwrap();

            prop_assert_eq!(&plan.stock_restorations, &decrements);
            let units: i32 = items.iter().map(|i| i.quantity).sum();
            let restored: i32 = plan.stock_restorations.iter().map(|(_, q)| q).sum();
            prop_assert_eq!(units, restored);
        }

        /// Settlement never creates debt beyond the total
        #[test]
        fn prop_settlement_bounds(total in 0i64..1_000_000, paid in 0i64..1_000_000) {
            let total = Money::from_minor(total);
            let paid = Money::from_minor(paid);
            for method in [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Credit, PaymentMethod::Combined] {
                if let Ok(s) = settle_sale(method, total, Some(paid)) {
                    prop_assert!(s.remaining_balance <= total);
                    prop_assert!(!s.remaining_balance.is_negative());
                    prop_assert_eq!(s.remaining_balance, s.credit_increment);
                }
            }
        }
    }
}

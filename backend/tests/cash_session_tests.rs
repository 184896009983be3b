//! Cash session tests
//!
//! Tests for the daily register including:
//! - At most one unclosed session per business day
//! - Closing balance and profit arithmetic
//! - Closed sessions report their frozen figures
//! - Business dates honour the configured UTC offset

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    compute_figures, ensure_can_close, ensure_can_open, session_figures, BusinessCalendar,
    CashSession, ClosingFigures, DailyActivity, LedgerError, Money, OpeningBalances,
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

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_session(date: NaiveDate, cash: Money) -> CashSession {
    let now = Utc::now();
    CashSession {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        date,
        bank_balance: money("500"),
        wallet_primary_balance: Money::ZERO,
        wallet_secondary_balance: Money::ZERO,
        cash_balance: cash,
        total_balance: money("500") + cash,
        is_closed: false,
        notes: None,
        session_type: "daily".to_string(),
        closed_at: None,
        closing: None,
        created_at: now,
        updated_at: now,
    }
}

fn activity() -> DailyActivity {
    DailyActivity {
        cash_sales: money("300"),
        card_sales: money("150"),
        transfer_sales: money("50"),
        total_sales: money("600"),
        purchases: money("80"),
        paid_fixed_costs: money("20"),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// closing = opening cash + cash sales - expenses
    #[test]
    fn test_close_math() {
        let figures = compute_figures(money("100"), &activity());

        assert_eq!(figures.expenses, money("100"));
        assert_eq!(figures.closing_balance, money("300"));
        assert_eq!(figures.profit, money("500"));
        assert_eq!(figures.opening_balance, money("100"));
    }

    /// Expenses above the drawer yield a negative closing balance
    #[test]
    fn test_closing_may_go_negative() {
        let day_activity = DailyActivity {
            purchases: money("250"),
            ..DailyActivity::default()
        };

        let figures = compute_figures(money("100"), &day_activity);
        assert_eq!(figures.closing_balance, money("-150"));
        assert_eq!(figures.profit, money("-250"));
    }

    /// A second open session on the same day is refused
    #[test]
    fn test_session_uniqueness() {
        let today = day(2024, 5, 10);
        let session = open_session(today, money("100"));

        assert_eq!(
            ensure_can_open(today, Some(&session)).unwrap_err(),
            LedgerError::SessionAlreadyOpen(today)
        );
        assert!(ensure_can_open(today, None).is_ok());
        assert!(ensure_can_open(day(2024, 5, 11), Some(&session)).is_ok());
    }

    /// A closed session does not block reopening the day
    #[test]
    fn test_reopen_after_close() {
        let today = day(2024, 5, 10);
        let mut session = open_session(today, money("100"));
        session.is_closed = true;

        assert!(ensure_can_open(today, Some(&session)).is_ok());
    }

    #[test]
    fn test_close_requires_open_session() {
        let today = day(2024, 5, 10);
        assert_eq!(
            ensure_can_close(today, None).unwrap_err(),
            LedgerError::NoOpenSession(today)
        );

        let mut session = open_session(today, money("100"));
        assert_eq!(ensure_can_close(today, Some(&session)).unwrap().id, session.id);

        session.is_closed = true;
        assert!(ensure_can_close(today, Some(&session)).is_err());
    }

    /// Once closed, later activity does not change the reported figures
    #[test]
    fn test_frozen_figures_after_close() {
        let today = day(2024, 5, 10);
        let mut session = open_session(today, money("100"));
        let at_close = compute_figures(session.cash_balance, &activity());

        session.is_closed = true;
        session.closing = Some(at_close.closing());
        session.total_balance = at_close.closing_balance;

        let mut later = activity();
        later.cash_sales = money("999");
        later.total_sales = money("1999");

        let reported = session_figures(&session, &later);
        assert_eq!(reported.cash_sales, money("300"));
        assert_eq!(reported.total_sales, money("600"));
        assert_eq!(reported.closing_balance, money("300"));
        assert_eq!(reported.profit, money("500"));
    }

    /// An open session recomputes from live activity
    #[test]
    fn test_live_figures_while_open() {
        let session = open_session(day(2024, 5, 10), money("40"));
        let reported = session_figures(&session, &activity());
        assert_eq!(reported, compute_figures(money("40"), &activity()));
    }

    #[test]
    fn test_closing_figures_snapshot() {
        let figures = compute_figures(money("100"), &activity());
        let frozen: ClosingFigures = figures.closing();
        assert_eq!(frozen.expenses, money("100"));
        assert_eq!(frozen.card_sales, money("150"));
    }

    #[test]
    fn test_opening_balances_validation() {
        let balances = OpeningBalances {
            bank: money("10"),
            wallet_primary: money("5"),
            wallet_secondary: Money::ZERO,
            cash: money("20"),
        };
        assert!(balances.validate().is_ok());
        assert_eq!(balances.total(), money("35"));

        let negative = OpeningBalances { cash: money("-1"), ..balances };
        assert!(matches!(negative.validate(), Err(LedgerError::NegativeAmount { .. })));
    }

    /// A sale late in the evening local time belongs to that local day
    #[test]
    fn test_business_date_with_offset() {
        // UTC-5
        let calendar = BusinessCalendar::new(-300).unwrap();
        let late_evening = Utc.with_ymd_and_hms(2024, 5, 11, 3, 30, 0).unwrap();
        assert_eq!(calendar.business_date_of(late_evening), day(2024, 5, 10));

        let (start, end) = calendar.day_bounds(day(2024, 5, 10)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 10, 5, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 11, 5, 0, 0).unwrap());
    }

    /// The last representable day has no end bound; asking for it is an error, not a panic
    #[test]
    fn test_day_bounds_at_range_edges() {
        let west = BusinessCalendar::new(-300).unwrap();
        assert_eq!(
            west.day_bounds(NaiveDate::MAX).unwrap_err(),
            LedgerError::DateOutOfRange(NaiveDate::MAX)
        );
        assert!(west.day_bounds(NaiveDate::MIN).is_ok());

        let east = BusinessCalendar::new(600).unwrap();
        assert_eq!(
            east.day_bounds(NaiveDate::MIN).unwrap_err(),
            LedgerError::DateOutOfRange(NaiveDate::MIN)
        );

        let utc = BusinessCalendar::new(0).unwrap();
        assert!(utc.day_bounds(NaiveDate::MAX).is_err());
        assert!(utc.day_bounds(NaiveDate::MAX.pred_opt().unwrap()).is_ok());
    }

    /// Instants at the ends of the range still map to a business date
    #[test]
    fn test_business_date_at_range_edges() {
        let east = BusinessCalendar::new(840).unwrap();
        let last = DateTime::<Utc>::MAX_UTC;
        assert_eq!(east.business_date_of(last), last.date_naive());

        let west = BusinessCalendar::new(-720).unwrap();
        let first = DateTime::<Utc>::MIN_UTC;
        assert_eq!(west.business_date_of(first), first.date_naive());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn activity_strategy() -> impl Strategy<Value = DailyActivity> {
        (0i64..1_000_000, 0i64..1_000_000, 0i64..1_000_000, 0i64..500_000, 0i64..500_000).prop_map(
            |(cash, card, transfer, purchases, fixed)| DailyActivity {
                cash_sales: Money::from_minor(cash),
                card_sales: Money::from_minor(card),
                transfer_sales: Money::from_minor(transfer),
                total_sales: Money::from_minor(cash + card + transfer),
                purchases: Money::from_minor(purchases),
                paid_fixed_costs: Money::from_minor(fixed),
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The close identities hold for any day
        #[test]
        fn prop_close_identities(opening in 0i64..1_000_000, day_activity in activity_strategy()) {
            let opening = Money::from_minor(opening);
            let f = compute_figures(opening, &day_activity);

            prop_assert_eq!(f.expenses, day_activity.purchases + day_activity.paid_fixed_costs);
            prop_assert_eq!(f.closing_balance, opening + f.cash_sales - f.expenses);
            prop_assert_eq!(f.profit, f.total_sales - f.expenses);
        }

        /// Frozen figures survive any later activity
        #[test]
        fn prop_frozen_figures_stable(
            opening in 0i64..1_000_000,
            at_close in activity_strategy(),
            later in activity_strategy(),
        ) {
            let mut session = open_session(day(2024, 1, 15), Money::from_minor(opening));
            let figures = compute_figures(session.cash_balance, &at_close);
            session.is_closed = true;
            session.closing = Some(figures.closing());
            session.total_balance = figures.closing_balance;

            let reported = session_figures(&session, &later);
            prop_assert_eq!(reported.closing_balance, figures.closing_balance);
            prop_assert_eq!(reported.total_sales, figures.total_sales);
            prop_assert_eq!(reported.expenses, figures.expenses);
            prop_assert_eq!(reported.profit, figures.profit);
        }

        /// Day bounds always contain the instants mapped to that day
        #[test]
        fn prop_business_date_within_bounds(offset in -720i32..=840, days in -700_000i64..700_000, secs in 0i64..86_400) {
            let calendar = BusinessCalendar::new(offset).unwrap();
            let instant = Utc.timestamp_opt(days * 86_400 + secs, 0).unwrap();

            let date = calendar.business_date_of(instant);
            let (start, end) = calendar.day_bounds(date).unwrap();
            prop_assert!(start <= instant && instant < end);
        }
    }
}

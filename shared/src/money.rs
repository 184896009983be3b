//! Ledger primitives: fixed-point money and the paid/pending split of a sale

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Number of fractional digits carried by every monetary amount
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount with exactly two fractional digits.
///
/// Construction always rounds half away from zero, so sums and differences
/// of `Money` values never accumulate sub-cent residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Round an arbitrary decimal to a monetary amount
    pub fn new(amount: Decimal) -> Self {
        Money(amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Build from integer minor units (cents)
    pub const fn from_minor(minor: i64) -> Self {
        let abs = minor.unsigned_abs();
        Money(Decimal::from_parts(abs as u32, (abs >> 32) as u32, 0, minor < 0, MONEY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount in integer minor units
    pub fn minor_units(&self) -> i64 {
        let mut scaled = self.0;
        scaled.rescale(MONEY_SCALE);
        scaled.mantissa() as i64
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiply by a quantity, rounding the product to cents
    pub fn times(&self, quantity: Decimal) -> Self {
        Money::new(self.0 * quantity)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

/// How a sale total divides between money collected now and customer debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub cash: Money,
    pub credit: Money,
}

impl PaymentSplit {
    pub fn total(&self) -> Money {
        self.cash + self.credit
    }
}

/// Split a sale total into the portion paid at sale time and the deferred portion.
///
/// `cash + credit == total` holds exactly because both parts are derived by
/// subtraction from the same two-digit amounts.
pub fn split_payment(total: Money, paid: Money) -> Result<PaymentSplit, LedgerError> {
    if total.is_negative() {
        return Err(LedgerError::NegativeAmount { field: "total" });
    }
    if paid.is_negative() {
        return Err(LedgerError::NegativeAmount { field: "cash_received" });
    }
    if paid > total {
        return Err(LedgerError::PaidExceedsTotal { paid, total });
    }

    Ok(PaymentSplit {
        cash: paid,
        credit: total - paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        assert_eq!(money("10.005"), money("10.01"));
        assert_eq!(money("10.004"), money("10.00"));
        assert_eq!(money("-2.345"), money("-2.35"));
    }

    #[test]
    fn test_decimal_sum_has_no_float_drift() {
        let total: Money = [money("0.10"), money("0.20")].iter().sum();
        assert_eq!(total, money("0.30"));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(money("12.34").minor_units(), 1234);
        assert_eq!(Money::from_minor(505), money("5.05"));
        assert_eq!(money("-1.50").minor_units(), -150);
    }

    #[test]
    fn test_split_payment_combined() {
        let split = split_payment(money("100.00"), money("35.50")).unwrap();
        assert_eq!(split.cash, money("35.50"));
        assert_eq!(split.credit, money("64.50"));
        assert_eq!(split.total(), money("100.00"));
    }

    #[test]
    fn test_split_payment_fully_paid_and_fully_deferred() {
        let paid = split_payment(money("80.00"), money("80.00")).unwrap();
        assert!(paid.credit.is_zero());

        let deferred = split_payment(money("80.00"), Money::ZERO).unwrap();
        assert_eq!(deferred.credit, money("80.00"));
    }

    #[test]
    fn test_split_payment_rejects_overpayment() {
        let err = split_payment(money("10.00"), money("10.01")).unwrap_err();
        assert!(matches!(err, LedgerError::PaidExceedsTotal { .. }));
    }

    #[test]
    fn test_split_payment_rejects_negative_paid() {
        assert!(split_payment(money("10.00"), money("-1.00")).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(money("7").to_string(), "7.00");
    }
}

//! Ingredient inventory tests
//!
//! Tests for recipe costing and stock including:
//! - Unit conversion between purchase and portion units
//! - Portion cost and portion count of a purchase
//! - Stock reductions never go below zero

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    convert_quantity, convert_to_portions, portion_cost, portion_figures, reduce_stock, unit_price,
    LedgerError, Money,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_convert_quantity() {
        assert_eq!(convert_quantity(dec("1.5"), "kg", "g"), dec("1500"));
        assert_eq!(convert_quantity(dec("250"), "ml", "L"), dec("0.25"));
        assert_eq!(convert_quantity(dec("3"), "unit", "unit"), dec("3"));
        // Unknown pairs are left alone
        assert_eq!(convert_quantity(dec("3"), "kg", "ml"), dec("3"));
    }

    /// 2 kg bought for 30.00, used in 18 g portions
    #[test]
    fn test_portion_figures() {
        let figures = portion_figures(Money::new(dec("30")), dec("2"), "kg", dec("18"), "g").unwrap();

        assert_eq!(figures.price, dec("15"));
        assert_eq!(figures.portion_cost, dec("0.27"));
        assert_eq!(figures.stock, 111);
    }

    #[test]
    fn test_unit_price_needs_quantity() {
        assert!(matches!(
            unit_price(Money::new(dec("10")), Decimal::ZERO),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_portion_cost_zero_inputs() {
        assert_eq!(portion_cost(Decimal::ZERO, dec("10"), "kg", "g"), Decimal::ZERO);
        assert_eq!(portion_cost(dec("5"), Decimal::ZERO, "kg", "g"), Decimal::ZERO);
    }

    #[test]
    fn test_convert_to_portions_floors() {
        assert_eq!(convert_to_portions(dec("1"), "l", dec("300"), "ml"), 3);
        assert_eq!(convert_to_portions(dec("0"), "l", dec("300"), "ml"), 0);
    }

    #[test]
    fn test_reduce_stock() {
        assert_eq!(reduce_stock(10, 4).unwrap(), 6);
        assert_eq!(reduce_stock(4, 4).unwrap(), 0);
        assert_eq!(
            reduce_stock(3, 4).unwrap_err(),
            LedgerError::InsufficientStock { available: 3, requested: 4 }
        );
        assert!(reduce_stock(3, 0).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Stock after a reduction is never negative
        #[test]
        fn prop_reduce_stock_non_negative(current in 0i32..10_000, portions in 1i32..10_000) {
            match reduce_stock(current, portions) {
                Ok(left) => {
                    prop_assert!(left >= 0);
                    prop_assert_eq!(left + portions, current);
                }
                Err(_) => prop_assert!(portions > current),
            }
        }

        /// kg to g and back is lossless
        #[test]
        fn prop_mass_conversion_reversible(grams in 0i64..10_000_000) {
            let g = Decimal::from(grams);
            let kg = convert_quantity(g, "g", "kg");
            prop_assert_eq!(convert_quantity(kg, "kg", "g"), g);
        }

        /// Whole portions never use more than the purchased quantity
        #[test]
        fn prop_portions_fit_purchase(quantity in 1i64..100_000, portion in 1i64..5_000) {
            let quantity = Decimal::from(quantity);
            let portion = Decimal::from(portion);
            let portions = convert_to_portions(quantity, "g", portion, "g");

            prop_assert!(Decimal::from(portions) * portion <= quantity);
            prop_assert!(Decimal::from(portions + 1) * portion > quantity);
        }
    }
}

//! Fixed cost apportionment tests
//!
//! Tests for pricing products with fixed costs including:
//! - Weighted shares sum to the period's fixed costs
//! - Secondary products carry a reduced weight
//! - Products without sales fall back or ask for manual input
//! - Bundle sales credit their component products

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::apportionment::{
    allocate_fixed_costs, distribute, estimate_unit_sales, manual_apportion, period_fixed_costs,
    recommended_price, AllocationRequest, BundleRule, FixedCostAllocation, FixedCostSource,
    ManualQuantity, ReportingPeriod, WeightedProduct, DEFAULT_WORKING_DAYS_PER_MONTH,
};
use shared::{LedgerError, Money};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn money(s: &str) -> Money {
    Money::new(dec(s))
}

fn product(is_main: bool, weight: &str, sales: &str) -> WeightedProduct {
    WeightedProduct {
        product_id: Uuid::new_v4(),
        is_main_product: is_main,
        cost_weight: dec(weight),
        estimated_sales: dec(sales),
    }
}

fn request<'a>(target: WeightedProduct, pool: &'a [WeightedProduct], fixed: &str) -> AllocationRequest<'a> {
    AllocationRequest {
        target,
        variable_cost: money("2.00"),
        pool,
        period_fixed_costs: money(fixed),
        margin: dec("20"),
        zero_sales_fallback: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two equally weighted main products split costs by units sold
    #[test]
    fn test_distribute_by_units() {
        let a = product(true, "1", "300");
        let b = product(true, "1", "100");
        let shares = distribute(money("1000"), &[a, b]);

        assert_eq!(shares[0].share, dec("750"));
        assert_eq!(shares[1].share, dec("250"));
        assert_eq!(shares[0].per_unit, Some(dec("2.5")));
    }

    /// A secondary product counts at 10% of its weight
    #[test]
    fn test_secondary_weight_factor() {
        let main = product(true, "1", "100");
        let side = product(false, "1", "100");

        assert_eq!(side.adjusted_weight(), dec("0.1"));
        let shares = distribute(money("1100"), &[main, side]);
        assert_eq!(shares[0].share, dec("1000"));
        assert_eq!(shares[1].share, dec("100"));
    }

    /// Repeated product ids are counted once
    #[test]
    fn test_distribute_deduplicates() {
        let a = product(true, "1", "10");
        let shares = distribute(money("100"), &[a, a]);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].share, dec("100"));
    }

    /// A full allocation prices the unit with the margin on top of cost
    #[test]
    fn test_allocate_fixed_costs_computed() {
        let target = product(true, "1", "100");
        let other = product(true, "1", "100");
        let pool = [target, other];

        let result = allocate_fixed_costs(&request(target, &pool, "400")).unwrap();
        let FixedCostAllocation::Computed(analysis) = result else {
            panic!("expected a computed allocation");
        };

        assert_eq!(analysis.fixed_cost_per_unit, money("2.00"));
        assert_eq!(analysis.fixed_cost_source, FixedCostSource::WeightedShare);
        assert_eq!(analysis.total_cost_per_unit, money("4.00"));
        assert_eq!(analysis.recommended_price, money("5.00"));
        assert_eq!(analysis.profit_per_unit, money("1.00"));
        assert_eq!(analysis.fixed_cost_share, money("200"));
        assert_eq!(analysis.pool_weighted_sales, dec("200"));
    }

    /// Without sales and without a fallback the caller must enter quantities
    #[test]
    fn test_zero_sales_needs_manual_input() {
        let target = product(true, "1", "0");
        let other = product(true, "1", "50");
        let pool = [other];

        let result = allocate_fixed_costs(&request(target, &pool, "500")).unwrap();
        assert!(result.needs_manual_input());
    }

    /// The configured fallback is used for a product that sold nothing
    #[test]
    fn test_zero_sales_fallback() {
        let target = product(true, "1", "0");
        let pool = [product(true, "1", "50")];
        let mut req = request(target, &pool, "500");
        req.zero_sales_fallback = Some(money("0.75"));

        let FixedCostAllocation::Computed(analysis) = allocate_fixed_costs(&req).unwrap() else {
            panic!("expected a computed allocation");
        };
        assert_eq!(analysis.fixed_cost_per_unit, money("0.75"));
        assert_eq!(analysis.fixed_cost_source, FixedCostSource::ZeroSalesFallback);
        assert_eq!(analysis.fixed_cost_share, Money::ZERO);
    }

    #[test]
    fn test_margin_bounds() {
        assert!(recommended_price(money("10"), dec("0")).is_ok());
        assert_eq!(recommended_price(money("10"), dec("50")).unwrap(), money("20"));
        assert_eq!(
            recommended_price(money("10"), dec("100")).unwrap_err(),
            LedgerError::InvalidMargin(dec("100"))
        );
        assert!(recommended_price(money("10"), dec("-1")).is_err());
    }

    /// Period multipliers scale the monthly total
    #[test]
    fn test_period_fixed_costs() {
        let monthly = money("1000");
        let days = DEFAULT_WORKING_DAYS_PER_MONTH;

        assert_eq!(period_fixed_costs(monthly, &ReportingPeriod::LastMonth, days), money("1000"));
        assert_eq!(period_fixed_costs(monthly, &ReportingPeriod::LastQuarter, days), money("3000"));
        assert_eq!(period_fixed_costs(monthly, &ReportingPeriod::LastYear, days), money("12000"));

        let custom = ReportingPeriod::Custom { working_days: 5, weeks: 2 };
        // 2 weeks * 5 days / 22 days
        assert_eq!(period_fixed_costs(monthly, &custom, days), money("454.55"));
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(ReportingPeriod::parse("lastMonth", None, None).unwrap(), ReportingPeriod::LastMonth);
        assert_eq!(ReportingPeriod::parse("last_quarter", None, None).unwrap(), ReportingPeriod::LastQuarter);
        assert!(ReportingPeriod::parse("custom", Some(8), Some(1)).is_err());
        assert!(ReportingPeriod::parse("custom", Some(5), None).is_err());
        assert!(ReportingPeriod::parse("fortnight", None, None).is_err());
    }

    /// A bundle sale also counts toward its component
    #[test]
    fn test_bundle_units_credited_to_component() {
        let bundle = Uuid::new_v4();
        let component = Uuid::new_v4();
        let rules = [BundleRule {
            bundle_product_id: bundle,
            component_product_id: component,
            units_per_bundle: dec("6"),
        }];

        let units = estimate_unit_sales(vec![(bundle, 2), (component, 3)], &rules);
        assert_eq!(units[&bundle], dec("2"));
        assert_eq!(units[&component], dec("15"));
    }

    /// Manual apportionment splits by quantity only
    #[test]
    fn test_manual_apportion() {
        let a = ManualQuantity { product_id: Uuid::new_v4(), quantity: dec("30") };
        let b = ManualQuantity { product_id: Uuid::new_v4(), quantity: dec("10") };
        let shares = manual_apportion(money("200"), &[a, b]).unwrap();

        assert_eq!(shares[0].fixed_cost, money("150"));
        assert_eq!(shares[0].fixed_cost_per_unit, money("5"));
        assert_eq!(shares[1].fixed_cost, money("50"));

        let negative = ManualQuantity { product_id: Uuid::new_v4(), quantity: dec("-1") };
        assert!(manual_apportion(money("200"), &[negative]).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn pool_strategy() -> impl Strategy<Value = Vec<WeightedProduct>> {
        prop::collection::vec((any::<bool>(), 1u32..50, 0u32..2000), 1..10).prop_map(|specs| {
            specs
                .into_iter()
                .map(|(is_main, weight, sales)| WeightedProduct {
                    product_id: Uuid::new_v4(),
                    is_main_product: is_main,
                    cost_weight: Decimal::new(i64::from(weight), 1),
                    estimated_sales: Decimal::from(sales),
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Shares add up to the total whenever anything sold
        #[test]
        fn prop_shares_sum_to_total(pool in pool_strategy(), total_cents in 0i64..10_000_000) {
            let total = Money::from_minor(total_cents);
            let shares = distribute(total, &pool);
            let weighted: Decimal = shares.iter().map(|s| s.weighted_sales).sum();
            prop_assume!(weighted > Decimal::ZERO);

            let sum: Decimal = shares.iter().map(|s| s.share).sum();
            let diff = (sum - total.amount()).abs();
            prop_assert!(diff <= dec("0.0000001"), "sum {} total {}", sum, total);
        }

        /// A share is never negative and only products with sales get a per-unit cost
        #[test]
        fn prop_shares_non_negative(pool in pool_strategy(), total_cents in 0i64..10_000_000) {
            let shares = distribute(Money::from_minor(total_cents), &pool);
            for s in &shares {
                prop_assert!(s.share >= Decimal::ZERO);
                prop_assert_eq!(s.per_unit.is_some(), s.estimated_sales > Decimal::ZERO);
            }
        }

        /// The recommended price keeps the margin as a share of the price
        #[test]
        fn prop_price_covers_cost(cost_cents in 1i64..1_000_000, margin in 0u32..95) {
            let cost = Money::from_minor(cost_cents);
            let price = recommended_price(cost, Decimal::from(margin)).unwrap();
            prop_assert!(price >= cost);
        }

        /// Manual shares sum to the total within rounding when any quantity is entered
        #[test]
        fn prop_manual_shares_sum(quantities in prop::collection::vec(0u32..500, 1..8), total_cents in 0i64..1_000_000) {
            let entries: Vec<ManualQuantity> = quantities
                .iter()
                .map(|q| ManualQuantity { product_id: Uuid::new_v4(), quantity: Decimal::from(*q) })
                .collect();
            prop_assume!(quantities.iter().any(|q| *q > 0));

            let total = Money::from_minor(total_cents);
            let shares = manual_apportion(total, &entries).unwrap();
            let sum: Money = shares.iter().map(|s| s.fixed_cost).sum();
            let diff = (sum - total).amount().abs();
            prop_assert!(diff <= Decimal::new(entries.len() as i64, 2));
        }
    }
}

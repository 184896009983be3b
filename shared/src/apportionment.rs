//! Fixed-cost apportionment engine.
//!
//! Loads a share of the period's fixed costs onto one unit of a product using
//! weighted sales, then prices the unit for a target margin.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::DateRange;
use crate::error::{LedgerError, LedgerResult};
use crate::models::BundleConversion;
use crate::money::Money;

/// Share of nominal weight absorbed by secondary products (0.1)
pub const SECONDARY_WEIGHT_FACTOR: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Average working days in a month, used to scale custom periods
pub const DEFAULT_WORKING_DAYS_PER_MONTH: u32 = 22;

/// Reporting window the fixed costs and unit sales are measured over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportingPeriod {
    LastMonth,
    LastQuarter,
    LastYear,
    Custom { working_days: u32, weeks: u32 },
}

impl ReportingPeriod {
    /// Parse the period name used by the pricing screen
    /// (`lastMonth`, `lastQuarter`, `lastYear`, `custom`).
    pub fn parse(kind: &str, working_days: Option<u32>, weeks: Option<u32>) -> LedgerResult<Self> {
        let period = match kind.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "lastmonth" => ReportingPeriod::LastMonth,
            "lastquarter" => ReportingPeriod::LastQuarter,
            "lastyear" => ReportingPeriod::LastYear,
            "custom" => {
                let working_days = working_days.ok_or_else(|| {
                    LedgerError::InvalidPeriod("custom period needs working_days".to_string())
                })?;
                let weeks = weeks.ok_or_else(|| {
                    LedgerError::InvalidPeriod("custom period needs weeks".to_string())
                })?;
                ReportingPeriod::Custom { working_days, weeks }
            }
            other => return Err(LedgerError::InvalidPeriod(format!("unknown period '{}'", other))),
        };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if let ReportingPeriod::Custom { working_days, weeks } = *self {
            if !(1..=7).contains(&working_days) {
                return Err(LedgerError::InvalidPeriod(format!(
                    "working_days must be between 1 and 7, got {}",
                    working_days
                )));
            }
            if weeks == 0 {
                return Err(LedgerError::InvalidPeriod("weeks must be at least 1".to_string()));
            }
        }
        Ok(())
    }

    /// How many months of fixed costs the period carries
    pub fn multiplier(&self, working_days_per_month: u32) -> Decimal {
        match *self {
            ReportingPeriod::LastMonth => Decimal::ONE,
            ReportingPeriod::LastQuarter => Decimal::from(3),
            ReportingPeriod::LastYear => Decimal::from(12),
            ReportingPeriod::Custom { working_days, weeks } => {
                let baseline = working_days_per_month.max(1);
                Decimal::from(weeks) * Decimal::from(working_days) / Decimal::from(baseline)
            }
        }
    }

    /// Dates whose sales are counted, ending today
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        let start = match *self {
            ReportingPeriod::LastMonth => today.checked_sub_months(Months::new(1)),
            ReportingPeriod::LastQuarter => today.checked_sub_months(Months::new(3)),
            ReportingPeriod::LastYear => today.checked_sub_months(Months::new(12)),
            ReportingPeriod::Custom { weeks, .. } => {
                today.checked_sub_signed(Duration::days(i64::from(weeks) * 7))
            }
        };
        DateRange::new(start.unwrap_or(NaiveDate::MIN), today)
    }
}

/// Fixed costs carried by a period
pub fn period_fixed_costs(monthly_total: Money, period: &ReportingPeriod, working_days_per_month: u32) -> Money {
    monthly_total.times(period.multiplier(working_days_per_month))
}

/// A sale of one unit of `bundle_product_id` also counts as
/// `units_per_bundle` units of `component_product_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRule {
    pub bundle_product_id: Uuid,
    pub component_product_id: Uuid,
    pub units_per_bundle: Decimal,
}

impl From<&BundleConversion> for BundleRule {
    fn from(conversion: &BundleConversion) -> Self {
        Self {
            bundle_product_id: conversion.bundle_product_id,
            component_product_id: conversion.component_product_id,
            units_per_bundle: conversion.units_per_bundle,
        }
    }
}

/// Units sold per product, with bundle sales credited to their components.
/// The bundle product keeps its own units.
pub fn estimate_unit_sales<I>(lines: I, bundles: &[BundleRule]) -> HashMap<Uuid, Decimal>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut units: HashMap<Uuid, Decimal> = HashMap::new();

    for (product_id, quantity) in lines {
        let quantity = Decimal::from(quantity);
        *units.entry(product_id).or_insert(Decimal::ZERO) += quantity;

        for rule in bundles.iter().filter(|r| r.bundle_product_id == product_id) {
            *units.entry(rule.component_product_id).or_insert(Decimal::ZERO) +=
                quantity * rule.units_per_bundle;
        }
    }

    units
}

/// A product taking part in the weighted distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedProduct {
    pub product_id: Uuid,
    pub is_main_product: bool,
    pub cost_weight: Decimal,
    pub estimated_sales: Decimal,
}

impl WeightedProduct {
    pub fn adjusted_weight(&self) -> Decimal {
        if self.is_main_product {
            self.cost_weight
        } else {
            self.cost_weight * SECONDARY_WEIGHT_FACTOR
        }
    }

    pub fn weighted_sales(&self) -> Decimal {
        self.estimated_sales * self.adjusted_weight()
    }
}

/// One product's slice of the period's fixed costs (unrounded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductShare {
    pub product_id: Uuid,
    pub estimated_sales: Decimal,
    pub weighted_sales: Decimal,
    pub share: Decimal,
    /// `None` when the product sold nothing
    pub per_unit: Option<Decimal>,
}

/// Split `total` across `products` in proportion to their weighted sales.
/// Products are taken once each; a repeated id keeps its first entry.
pub fn distribute(total: Money, products: &[WeightedProduct]) -> Vec<ProductShare> {
    let mut seen = Vec::with_capacity(products.len());
    let unique: Vec<&WeightedProduct> = products
        .iter()
        .filter(|p| {
            if seen.contains(&p.product_id) {
                false
            } else {
                seen.push(p.product_id);
                true
            }
        })
        .collect();

    let pool: Decimal = unique.iter().map(|p| p.weighted_sales()).sum();

    unique
        .into_iter()
        .map(|p| {
            let weighted_sales = p.weighted_sales();
            let share = if pool > Decimal::ZERO {
                total.amount() * weighted_sales / pool
            } else {
                Decimal::ZERO
            };
            let per_unit = if p.estimated_sales > Decimal::ZERO {
                Some(share / p.estimated_sales)
            } else {
                None
            };
            ProductShare {
                product_id: p.product_id,
                estimated_sales: p.estimated_sales,
                weighted_sales,
                share,
                per_unit,
            }
        })
        .collect()
}

/// Margin must be in `[0, 100)`
pub fn validate_margin(margin: Decimal) -> LedgerResult<()> {
    if margin < Decimal::ZERO || margin >= Decimal::ONE_HUNDRED {
        return Err(LedgerError::InvalidMargin(margin));
    }
    Ok(())
}

/// Price that leaves `margin` percent of the price as profit over `unit_cost`
pub fn recommended_price(unit_cost: Money, margin: Decimal) -> LedgerResult<Money> {
    validate_margin(margin)?;
    let keep = Decimal::ONE - margin / Decimal::ONE_HUNDRED;
    Ok(Money::new(unit_cost.amount() / keep))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedCostSource {
    /// Derived from the product's weighted share
    WeightedShare,
    /// Configured per-unit amount used for products without sales
    ZeroSalesFallback,
}

/// Inputs of a single product's allocation
#[derive(Debug, Clone)]
pub struct AllocationRequest<'a> {
    pub target: WeightedProduct,
    pub variable_cost: Money,
    /// Other active products sharing the costs; the target may appear here too
    pub pool: &'a [WeightedProduct],
    pub period_fixed_costs: Money,
    pub margin: Decimal,
    pub zero_sales_fallback: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub product_id: Uuid,
    pub variable_cost: Money,
    pub fixed_cost_per_unit: Money,
    pub fixed_cost_source: FixedCostSource,
    pub total_cost_per_unit: Money,
    pub profit_margin: Decimal,
    pub recommended_price: Money,
    pub profit_per_unit: Money,
    pub estimated_sales: Decimal,
    pub adjusted_weight: Decimal,
    pub weighted_sales: Decimal,
    pub pool_weighted_sales: Decimal,
    pub fixed_cost_share: Money,
    pub period_fixed_costs: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FixedCostAllocation {
    Computed(CostAnalysis),
    NeedsManualInput {
        product_id: Uuid,
        period_fixed_costs: Money,
        reason: String,
    },
}

impl FixedCostAllocation {
    pub fn needs_manual_input(&self) -> bool {
        matches!(self, FixedCostAllocation::NeedsManualInput { .. })
    }
}

/// Allocate the period's fixed costs to one unit of the target product
pub fn allocate_fixed_costs(request: &AllocationRequest<'_>) -> LedgerResult<FixedCostAllocation> {
    validate_margin(request.margin)?;
    if request.period_fixed_costs.is_negative() {
        return Err(LedgerError::NegativeAmount { field: "fixed_costs" });
    }

    let target = request.target;
    let mut products = Vec::with_capacity(request.pool.len() + 1);
    products.push(target);
    products.extend(request.pool.iter().filter(|p| p.product_id != target.product_id).copied());

    let shares = distribute(request.period_fixed_costs, &products);
    let pool_weighted_sales: Decimal = shares.iter().map(|s| s.weighted_sales).sum();
    let target_share = shares
        .iter()
        .find(|s| s.product_id == target.product_id)
        .copied()
        .unwrap_or(ProductShare {
            product_id: target.product_id,
            estimated_sales: target.estimated_sales,
            weighted_sales: Decimal::ZERO,
            share: Decimal::ZERO,
            per_unit: None,
        });

    let (fixed_cost_per_unit, fixed_cost_source) = match target_share.per_unit {
        Some(per_unit) => (Money::new(per_unit), FixedCostSource::WeightedShare),
        None => match request.zero_sales_fallback {
            Some(fallback) => (fallback, FixedCostSource::ZeroSalesFallback),
            None => {
                return Ok(FixedCostAllocation::NeedsManualInput {
                    product_id: target.product_id,
                    period_fixed_costs: request.period_fixed_costs,
                    reason: "no sales recorded for this product in the selected period".to_string(),
                })
            }
        },
    };

    let total_cost_per_unit = request.variable_cost + fixed_cost_per_unit;
    let price = recommended_price(total_cost_per_unit, request.margin)?;

    Ok(FixedCostAllocation::Computed(CostAnalysis {
        product_id: target.product_id,
        variable_cost: request.variable_cost,
        fixed_cost_per_unit,
        fixed_cost_source,
        total_cost_per_unit,
        profit_margin: request.margin,
        recommended_price: price,
        profit_per_unit: price - total_cost_per_unit,
        estimated_sales: target.estimated_sales,
        adjusted_weight: target.adjusted_weight(),
        weighted_sales: target_share.weighted_sales,
        pool_weighted_sales,
        fixed_cost_share: Money::new(target_share.share),
        period_fixed_costs: request.period_fixed_costs,
    }))
}

/// Quantity entered for one product in the manual tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualQuantity {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualShare {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub fixed_cost: Money,
    pub fixed_cost_per_unit: Money,
}

/// Split `total` by each product's share of the entered quantities.
/// No weighting and no main/secondary distinction.
pub fn manual_apportion(total: Money, quantities: &[ManualQuantity]) -> LedgerResult<Vec<ManualShare>> {
    if total.is_negative() {
        return Err(LedgerError::NegativeAmount { field: "fixed_costs" });
    }
    if let Some(index) = quantities.iter().position(|q| q.quantity < Decimal::ZERO) {
        return Err(LedgerError::InvalidLineItem {
            index,
            reason: "quantity cannot be negative".to_string(),
        });
    }

    let total_quantity: Decimal = quantities.iter().map(|q| q.quantity).sum();

    Ok(quantities
        .iter()
        .map(|q| {
            let share = if total_quantity > Decimal::ZERO {
                total.amount() * q.quantity / total_quantity
            } else {
                Decimal::ZERO
            };
            let per_unit = if q.quantity > Decimal::ZERO {
                share / q.quantity
            } else {
                Decimal::ZERO
            };
            ManualShare {
                product_id: q.product_id,
                quantity: q.quantity,
                fixed_cost: Money::new(share),
                fixed_cost_per_unit: Money::new(per_unit),
            }
        })
        .collect())
}

impl FromStr for ReportingPeriod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportingPeriod::parse(s, None, None)
    }
}

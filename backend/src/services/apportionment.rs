//! Fixed-cost apportionment service
//!
//! Loads the figures the weighted allocation needs (period fixed costs, unit
//! sales estimated from completed sales, bundle rules and the active product
//! pool) and hands them to the pure engine in `shared::apportionment`.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::BusinessConfig;
use crate::error::{AppError, AppResult};
use crate::services::product::ProductService;
use crate::services::sale::{sale_in_window, BusinessWindow};
use shared::apportionment::{
    allocate_fixed_costs, estimate_unit_sales, manual_apportion, period_fixed_costs,
    AllocationRequest, BundleRule, FixedCostAllocation, ManualQuantity, ManualShare,
    ReportingPeriod, WeightedProduct,
};
use shared::{BusinessCalendar, Money, SaleLineItem};

#[derive(Clone)]
pub struct ApportionmentService {
    db: PgPool,
    calendar: BusinessCalendar,
    working_days_per_month: u32,
    zero_sales_fallback: Option<Money>,
    default_profit_margin: Decimal,
}

/// Query of a fixed-cost allocation
#[derive(Debug, Default, Deserialize)]
pub struct FixedCostAllocationQuery {
    /// lastMonth, lastQuarter, lastYear or custom
    pub period: Option<String>,
    pub working_days: Option<u32>,
    pub weeks: Option<u32>,
    /// Target margin in percent; defaults to the product's own margin
    pub profit_margin: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedCostAllocationReport {
    pub product_id: Uuid,
    pub product_name: String,
    pub period: ReportingPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_fixed_costs: Money,
    pub allocation: FixedCostAllocation,
}

/// Input of the manual apportionment tool
#[derive(Debug, Deserialize)]
pub struct ManualAllocationInput {
    pub products: Vec<ManualQuantity>,
    /// Fixed costs to apportion; all active ones when absent
    pub fixed_cost_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualAllocationReport {
    pub total_fixed_costs: Money,
    pub total_quantity: Decimal,
    pub shares: Vec<ManualShare>,
}

#[derive(Debug, sqlx::FromRow)]
struct PoolRow {
    id: Uuid,
    is_main_product: bool,
    cost_weight: Decimal,
}

impl ApportionmentService {
    pub fn new(db: PgPool, business: &BusinessConfig) -> Self {
        Self {
            db,
            calendar: business.calendar(),
            working_days_per_month: business.working_days_per_month,
            zero_sales_fallback: business.zero_sales_fallback(),
            default_profit_margin: business.default_profit_margin,
        }
    }

    /// Fixed cost to load onto one unit of a product, and the price reaching the target margin
    pub async fn fixed_cost_allocation(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        query: FixedCostAllocationQuery,
    ) -> AppResult<FixedCostAllocationReport> {
        let product = ProductService::new(self.db.clone(), self.default_profit_margin)
            .find_product(user_id, product_id)
            .await?;

        let period = ReportingPeriod::parse(
            query.period.as_deref().unwrap_or("lastMonth"),
            query.working_days,
            query.weeks,
        )?;
        let margin = query.profit_margin.unwrap_or(product.profit_margin);

        let monthly_total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM fixed_costs WHERE user_id = $1 AND is_active AND is_paid",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        let monthly_fixed_costs = Money::new(monthly_total);
        let period_costs = period_fixed_costs(monthly_fixed_costs, &period, self.working_days_per_month);

        let range = period.date_range(self.calendar.today(Utc::now()));
        let estimated = self
            .estimated_unit_sales(user_id, BusinessWindow::new(&self.calendar, range)?)
            .await?;
        let sales_of = |id: &Uuid| estimated.get(id).copied().unwrap_or(Decimal::ZERO);

        let pool: Vec<WeightedProduct> = sqlx::query_as::<_, PoolRow>(
            "SELECT id, is_main_product, cost_weight FROM products WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| WeightedProduct {
            estimated_sales: sales_of(&row.id),
            product_id: row.id,
            is_main_product: row.is_main_product,
            cost_weight: row.cost_weight,
        })
        .collect();

        let target = WeightedProduct {
            product_id: product.id,
            is_main_product: product.is_main_product,
            cost_weight: product.cost_weight,
            estimated_sales: sales_of(&product.id),
        };

        let allocation = allocate_fixed_costs(&AllocationRequest {
            target,
            variable_cost: product.cost,
            pool: &pool,
            period_fixed_costs: period_costs,
            margin,
            zero_sales_fallback: self.zero_sales_fallback,
        })?;

        if allocation.needs_manual_input() {
            tracing::warn!(product_id = %product.id, "Fixed cost allocation needs manual input");
        }

        Ok(FixedCostAllocationReport {
            product_id: product.id,
            product_name: product.name,
            period,
            start_date: range.start,
            end_date: range.end,
            monthly_fixed_costs,
            allocation,
        })
    }

    /// Units sold per product in the window, bundle sales credited to their components
    async fn estimated_unit_sales(
        &self,
        user_id: Uuid,
        window: BusinessWindow,
    ) -> AppResult<HashMap<Uuid, Decimal>> {
        let sales = sqlx::query_scalar::<_, Json<Vec<SaleLineItem>>>(&format!(
            "SELECT s.items FROM sales s WHERE s.user_id = $1 AND s.status = 'COMPLETED' AND {}",
            sale_in_window("s", 2)
        ))
        .bind(user_id)
        .bind(window.from)
        .bind(window.to)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.db)
        .await?;

        let bundles: Vec<BundleRule> = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            "SELECT bundle_product_id, component_product_id, units_per_bundle FROM bundle_conversions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(bundle_product_id, component_product_id, units_per_bundle)| BundleRule {
            bundle_product_id,
            component_product_id,
            units_per_bundle,
        })
        .collect();

        let lines = sales
            .iter()
            .flat_map(|items| items.0.iter().map(|i| (i.product_id, i.quantity)));

        Ok(estimate_unit_sales(lines, &bundles))
    }

    /// Split fixed costs by entered quantities, without weights
    pub async fn manual_allocation(
        &self,
        user_id: Uuid,
        input: ManualAllocationInput,
    ) -> AppResult<ManualAllocationReport> {
        check_manual_selection(&input)?;

        let product_ids: Vec<Uuid> = input.products.iter().map(|p| p.product_id).collect();
        let known: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(&product_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();
        if let Some(missing) = first_unknown(&product_ids, &known) {
            return Err(AppError::ProductNotFound(missing));
        }

        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM fixed_costs
            WHERE user_id = $1 AND is_active AND ($2::uuid[] IS NULL OR id = ANY($2))
            "#,
        )
        .bind(user_id)
        .bind(&input.fixed_cost_ids)
        .fetch_one(&self.db)
        .await?;
        let total_fixed_costs = Money::new(total);

        let shares = manual_apportion(total_fixed_costs, &input.products)?;

        Ok(ManualAllocationReport {
            total_fixed_costs,
            total_quantity: input.products.iter().map(|p| p.quantity).sum(),
            shares,
        })
    }
}

fn check_manual_selection(input: &ManualAllocationInput) -> AppResult<()> {
    if input.products.is_empty() {
        return Err(AppError::validation(
            "products",
            "At least one product quantity is required".to_string(),
            "Se requiere al menos una cantidad de producto".to_string(),
        ));
    }
    if matches!(&input.fixed_cost_ids, Some(ids) if ids.is_empty()) {
        return Err(AppError::validation(
            "fixed_cost_ids",
            "Select at least one fixed cost or omit the list".to_string(),
            "Seleccione al menos un costo fijo u omita la lista".to_string(),
        ));
    }
    Ok(())
}

fn first_unknown(ids: &[Uuid], known: &HashSet<Uuid>) -> Option<Uuid> {
    ids.iter().find(|id| !known.contains(id)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(products: usize, fixed_cost_ids: Option<Vec<Uuid>>) -> ManualAllocationInput {
        ManualAllocationInput {
            products: (0..products)
                .map(|_| ManualQuantity {
                    product_id: Uuid::new_v4(),
                    quantity: Decimal::ONE,
                })
                .collect(),
            fixed_cost_ids,
        }
    }

    #[test]
    fn test_manual_selection_requires_products() {
        assert!(matches!(
            check_manual_selection(&input(0, None)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_fixed_cost_list_is_rejected() {
        assert!(matches!(
            check_manual_selection(&input(1, Some(Vec::new()))),
            Err(AppError::Validation { .. })
        ));
        assert!(check_manual_selection(&input(1, None)).is_ok());
        assert!(check_manual_selection(&input(1, Some(vec![Uuid::new_v4()]))).is_ok());
    }

    #[test]
    fn test_first_unknown_product() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let known: HashSet<Uuid> = [a].into_iter().collect();
        assert_eq!(first_unknown(&[a], &known), None);
        assert_eq!(first_unknown(&[a, b, a], &known), Some(b));
    }
}

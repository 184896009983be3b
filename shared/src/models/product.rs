//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Money,
    /// Variable cost of one unit, from the recipe or entered manually
    pub cost: Money,
    pub profit_margin: Decimal,
    pub stock: i32,
    pub is_main_product: bool,
    pub cost_weight: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recipe line: quantity of an ingredient's portions used per unit of product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCost {
    pub id: Uuid,
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub quantity: Decimal,
    pub portion_cost: Decimal,
    pub line_cost: Money,
}

/// Product with its recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub recipe: Vec<ProductCost>,
}

/// One unit of `bundle_product_id` sold counts as `units_per_bundle` extra
/// units of `component_product_id` when estimating sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConversion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bundle_product_id: Uuid,
    pub component_product_id: Uuid,
    pub units_per_bundle: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Variable cost of one product unit: sum of portion cost times quantity
pub fn recipe_cost<'a, I>(lines: I) -> Money
where
    I: IntoIterator<Item = (&'a Decimal, &'a Decimal)>,
{
    let total: Decimal = lines
        .into_iter()
        .map(|(portion_cost, quantity)| *portion_cost * *quantity)
        .sum();
    Money::new(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_recipe_cost_sums_lines() {
        let lines = [(dec("400.0000"), dec("2")), (dec("12.3456"), dec("1.5"))];
        let cost = recipe_cost(lines.iter().map(|(c, q)| (c, q)));
        // 800 + 18.5184
        assert_eq!(cost, Money::new(dec("818.52")));
    }

    #[test]
    fn test_recipe_cost_empty() {
        let lines: Vec<(Decimal, Decimal)> = Vec::new();
        assert!(recipe_cost(lines.iter().map(|(c, q)| (c, q))).is_zero());
    }
}

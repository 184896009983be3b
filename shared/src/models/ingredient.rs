//! Ingredient models and portion arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;

/// Fractional digits kept for the cost of one portion
pub const PORTION_COST_SCALE: u32 = 4;

/// An ingredient bought in bulk and consumed in portions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    /// Unit the ingredient is purchased in
    pub unit: String,
    pub quantity_purchased: Decimal,
    pub purchase_value: Money,
    pub portion_quantity: Decimal,
    pub portion_unit: String,
    /// Price of one purchase unit
    pub price: Decimal,
    pub portion_cost: Decimal,
    /// Stock in whole portions
    pub stock: i32,
    pub min_stock: i32,
    pub max_stock: Option<i32>,
    pub supplier: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Derived figures of an ingredient purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortionFigures {
    pub price: Decimal,
    pub portion_cost: Decimal,
    pub stock: i32,
}

/// Convert a quantity between units. Mass (kg, g) and volume (l, ml) convert
/// by a factor of 1000; any other pair is treated as the same unit.
pub fn convert_quantity(quantity: Decimal, from_unit: &str, to_unit: &str) -> Decimal {
    let from = from_unit.trim().to_ascii_lowercase();
    let to = to_unit.trim().to_ascii_lowercase();
    let thousand = Decimal::from(1000);

    match (from.as_str(), to.as_str()) {
        ("kg", "g") | ("l", "ml") => quantity * thousand,
        ("g", "kg") | ("ml", "l") => quantity / thousand,
        _ => quantity,
    }
}

/// Price of one purchase unit
pub fn unit_price(purchase_value: Money, quantity_purchased: Decimal) -> LedgerResult<Decimal> {
    if quantity_purchased <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount {
            field: "quantity_purchased",
        });
    }
    Ok(purchase_value.amount() / quantity_purchased)
}

/// Cost of one portion, with the portion expressed in the purchase unit
pub fn portion_cost(
    price: Decimal,
    portion_quantity: Decimal,
    unit: &str,
    portion_unit: &str,
) -> Decimal {
    if price <= Decimal::ZERO || portion_quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let portion_in_unit = convert_quantity(portion_quantity, portion_unit, unit);
    (price * portion_in_unit)
        .round_dp_with_strategy(PORTION_COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Number of whole portions contained in `quantity` of `unit`
pub fn convert_to_portions(
    quantity: Decimal,
    unit: &str,
    portion_quantity: Decimal,
    portion_unit: &str,
) -> i32 {
    if quantity <= Decimal::ZERO || portion_quantity <= Decimal::ZERO {
        return 0;
    }
    let in_portion_unit = convert_quantity(quantity, unit, portion_unit);
    (in_portion_unit / portion_quantity)
        .floor()
        .to_i32()
        .unwrap_or(i32::MAX)
}

pub fn portion_figures(
    purchase_value: Money,
    quantity_purchased: Decimal,
    unit: &str,
    portion_quantity: Decimal,
    portion_unit: &str,
) -> LedgerResult<PortionFigures> {
    let price = unit_price(purchase_value, quantity_purchased)?;
    Ok(PortionFigures {
        price,
        portion_cost: portion_cost(price, portion_quantity, unit, portion_unit),
        stock: convert_to_portions(quantity_purchased, unit, portion_quantity, portion_unit),
    })
}

/// Stock after removing `portions`; never goes below zero
pub fn reduce_stock(current: i32, portions: i32) -> LedgerResult<i32> {
    if portions <= 0 {
        return Err(LedgerError::NonPositiveAmount { field: "quantity" });
    }
    if current < portions {
        return Err(LedgerError::InsufficientStock {
            available: current,
            requested: portions,
        });
    }
    Ok(current - portions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_convert_quantity() {
        assert_eq!(convert_quantity(dec("2"), "kg", "g"), dec("2000"));
        assert_eq!(convert_quantity(dec("250"), "ml", "L"), dec("0.25"));
        assert_eq!(convert_quantity(dec("3"), "unidad", "g"), dec("3"));
    }

    #[test]
    fn test_flour_bought_by_kg_portioned_in_grams() {
        let figures = portion_figures(Money::from_minor(1_000_000), dec("5"), "kg", dec("200"), "g").unwrap();
        assert_eq!(figures.price, dec("2000"));
        assert_eq!(figures.portion_cost, dec("400"));
        assert_eq!(figures.stock, 25);
    }

    #[test]
    fn test_stock_in_portions_floors() {
        assert_eq!(convert_to_portions(dec("1"), "l", dec("300"), "ml"), 3);
        assert_eq!(convert_to_portions(Decimal::ZERO, "l", dec("300"), "ml"), 0);
    }

    #[test]
    fn test_unit_price_rejects_zero_quantity() {
        assert!(unit_price(Money::from_minor(100), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_reduce_stock() {
        assert_eq!(reduce_stock(10, 4).unwrap(), 6);
        assert!(matches!(
            reduce_stock(3, 4),
            Err(LedgerError::InsufficientStock { available: 3, requested: 4 })
        ));
    }
}

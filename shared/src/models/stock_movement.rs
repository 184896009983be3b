//! Product stock movements written by sales and their reversals

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMovementType {
    /// Units leaving stock when a sale is recorded
    Sale,
    /// Units returned when a sale is reversed
    Reversal,
}

impl StockMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovementType::Sale => "sale",
            StockMovementType::Reversal => "reversal",
        }
    }

    /// Signed change to product stock for `quantity` units
    pub fn stock_delta(&self, quantity: i32) -> i32 {
        match self {
            StockMovementType::Sale => -quantity,
            StockMovementType::Reversal => quantity,
        }
    }
}

impl FromStr for StockMovementType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sale" => Ok(StockMovementType::Sale),
            "reversal" => Ok(StockMovementType::Reversal),
            other => Err(LedgerError::InvalidEnumValue {
                field: "movement_type",
                value: other.to_string(),
            }),
        }
    }
}

/// One change to a product's stock. `quantity` is always positive; the
/// direction comes from `movement_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sale_id: Option<Uuid>,
    pub movement_type: StockMovementType,
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_parsing() {
        assert_eq!("SALE".parse::<StockMovementType>().unwrap(), StockMovementType::Sale);
        assert_eq!("reversal".parse::<StockMovementType>().unwrap(), StockMovementType::Reversal);
        assert!(matches!(
            "adjustment".parse::<StockMovementType>(),
            Err(LedgerError::InvalidEnumValue { field: "movement_type", .. })
        ));
    }

    #[test]
    fn test_stock_delta_direction() {
        assert_eq!(StockMovementType::Sale.stock_delta(3), -3);
        assert_eq!(StockMovementType::Reversal.stock_delta(3), 3);
    }
}

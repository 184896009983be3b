//! Sale models and the settlement rules applied when a sale is recorded or reversed

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::money::{split_payment, Money};

/// How a sale was paid at the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Credit,
    Combined,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Combined => "combined",
        }
    }

    /// Credit and combined sales defer part of the total as customer debt
    pub fn is_deferred(&self) -> bool {
        matches!(self, PaymentMethod::Credit | PaymentMethod::Combined)
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            "credit" => Ok(PaymentMethod::Credit),
            "combined" => Ok(PaymentMethod::Combined),
            other => Err(LedgerError::InvalidEnumValue {
                field: "payment_method",
                value: other.to_string(),
            }),
        }
    }
}

/// Methods accepted when a customer pays down credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    Cash,
    Card,
    Transfer,
}

impl CollectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMethod::Cash => "cash",
            CollectionMethod::Card => "card",
            CollectionMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for CollectionMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(CollectionMethod::Cash),
            "card" => Ok(CollectionMethod::Card),
            "transfer" => Ok(CollectionMethod::Transfer),
            other => Err(LedgerError::InvalidEnumValue {
                field: "payment_method",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    Reversed,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Reversed => "REVERSED",
        }
    }
}

impl FromStr for SaleStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(SaleStatus::Completed),
            "REVERSED" => Ok(SaleStatus::Reversed),
            other => Err(LedgerError::InvalidEnumValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// One product line of a sale. The unit price is a snapshot taken at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Money,
}

impl SaleLineItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(Decimal::from(self.quantity))
    }
}

/// A recorded sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_document: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub items: Vec<SaleLineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub cash_received: Money,
    pub change_amount: Money,
    pub remaining_balance: Money,
    pub transaction_number: Option<String>,
    pub status: SaleStatus,
    pub sale_date: Option<NaiveDate>,
    pub reversal_reason: Option<String>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Monetary header of a sale as submitted by the register
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

/// Validate line items and return their subtotal
pub fn validate_line_items(items: &[SaleLineItem]) -> LedgerResult<Money> {
    if items.is_empty() {
        return Err(LedgerError::InvalidLineItem {
            index: 0,
            reason: "a sale needs at least one item".to_string(),
        });
    }

    for (index, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(LedgerError::InvalidLineItem {
                index,
                reason: format!("quantity must be positive, got {}", item.quantity),
            });
        }
        if item.unit_price.is_negative() {
            return Err(LedgerError::InvalidLineItem {
                index,
                reason: "unit price cannot be negative".to_string(),
            });
        }
    }

    Ok(items.iter().map(SaleLineItem::line_total).sum())
}

/// Check that the submitted header is consistent with the line items
pub fn check_totals(items: &[SaleLineItem], totals: &SaleTotals) -> LedgerResult<()> {
    let computed_subtotal = validate_line_items(items)?;

    for (field, value) in [
        ("subtotal", totals.subtotal),
        ("tax", totals.tax),
        ("discount", totals.discount),
        ("total", totals.total),
    ] {
        if value.is_negative() {
            return Err(LedgerError::NegativeAmount { field });
        }
    }

    if computed_subtotal != totals.subtotal {
        return Err(LedgerError::TotalsMismatch(format!(
            "subtotal {} does not match line items {}",
            totals.subtotal, computed_subtotal
        )));
    }

    let expected_total = totals.subtotal + totals.tax - totals.discount;
    if expected_total != totals.total {
        return Err(LedgerError::TotalsMismatch(format!(
            "total {} does not equal subtotal + tax - discount = {}",
            totals.total, expected_total
        )));
    }

    Ok(())
}

/// What recording a sale does to money and customer debt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleSettlement {
    /// Amount collected at the register
    pub cash_received: Money,
    pub change_amount: Money,
    pub remaining_balance: Money,
    /// Increase of the customer's credit balance
    pub credit_increment: Money,
}

pub fn settle_sale(
    method: PaymentMethod,
    total: Money,
    cash_received: Option<Money>,
) -> LedgerResult<SaleSettlement> {
    match method {
        PaymentMethod::Cash => {
            let received = cash_received.unwrap_or(total);
            if received < total {
                return Err(LedgerError::InsufficientCash { received, total });
            }
            Ok(SaleSettlement {
                cash_received: received,
                change_amount: received - total,
                remaining_balance: Money::ZERO,
                credit_increment: Money::ZERO,
            })
        }
        PaymentMethod::Card | PaymentMethod::Transfer => Ok(SaleSettlement {
            cash_received: total,
            change_amount: Money::ZERO,
            remaining_balance: Money::ZERO,
            credit_increment: Money::ZERO,
        }),
        PaymentMethod::Credit => Ok(SaleSettlement {
            cash_received: Money::ZERO,
            change_amount: Money::ZERO,
            remaining_balance: total,
            credit_increment: total,
        }),
        PaymentMethod::Combined => {
            let split = split_payment(total, cash_received.unwrap_or(Money::ZERO))?;
            Ok(SaleSettlement {
                cash_received: split.cash,
                change_amount: Money::ZERO,
                remaining_balance: split.credit,
                credit_increment: split.credit,
            })
        }
    }
}

/// Cash/credit view of a sale for listings and receipts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentBreakdown {
    pub cash_amount: Money,
    pub credit_amount: Money,
    pub description: String,
}

pub fn payment_breakdown(
    method: PaymentMethod,
    total: Money,
    cash_received: Money,
    remaining_balance: Money,
) -> PaymentBreakdown {
    let (cash_amount, credit_amount) = match method {
        PaymentMethod::Combined => (cash_received, remaining_balance),
        PaymentMethod::Credit => (Money::ZERO, total),
        _ => (total, Money::ZERO),
    };

    let description = match (cash_amount.is_positive(), credit_amount.is_positive()) {
        (true, true) => format!("Paid: ${} up front, ${} on credit", cash_amount, credit_amount),
        (false, true) => format!("Paid: ${} on credit", credit_amount),
        _ => format!("Paid: ${} up front", cash_amount),
    };

    PaymentBreakdown {
        cash_amount,
        credit_amount,
        description,
    }
}

/// Effects of reversing a completed sale
#[derive(Debug, Clone, PartialEq)]
pub struct ReversalPlan {
    /// Units to return to stock, per product, in product id order
    pub stock_restorations: Vec<(Uuid, i32)>,
    /// Amount released from the customer's credit balance
    pub credit_release: Money,
}

/// Plan the reversal of a sale.
///
/// Only the still-outstanding credit is released; amounts collected at sale
/// time or through later credit payments stay collected.
pub fn plan_reversal(sale: &Sale) -> LedgerResult<ReversalPlan> {
    if sale.status != SaleStatus::Completed {
        return Err(LedgerError::SaleNotReversible(sale.id));
    }

    let stock_restorations = units_per_product(&sale.items)?;

    let credit_release = if sale.payment_method.is_deferred() {
        sale.remaining_balance
    } else {
        Money::ZERO
    };

    Ok(ReversalPlan {
        stock_restorations,
        credit_release,
    })
}

/// Stock deltas for recording a sale, aggregated per product in id order
pub fn stock_decrements(items: &[SaleLineItem]) -> LedgerResult<Vec<(Uuid, i32)>> {
    units_per_product(items)
}

fn units_per_product(items: &[SaleLineItem]) -> LedgerResult<Vec<(Uuid, i32)>> {
    let mut per_product: BTreeMap<Uuid, i32> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        let units = per_product.entry(item.product_id).or_insert(0);
        *units = units.checked_add(item.quantity).ok_or_else(|| LedgerError::InvalidLineItem {
            index,
            reason: "combined quantity for the product exceeds the supported maximum".to_string(),
        })?;
    }
    Ok(per_product.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    fn item(quantity: i32, price: &str) -> SaleLineItem {
        SaleLineItem {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: money(price),
        }
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("CASH".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("combined".parse::<PaymentMethod>().unwrap(), PaymentMethod::Combined);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
        assert!("credit".parse::<CollectionMethod>().is_err());
    }

    #[test]
    fn test_check_totals_accepts_consistent_sale() {
        let items = vec![item(2, "10.50"), item(1, "4.00")];
        let totals = SaleTotals {
            subtotal: money("25.00"),
            tax: money("2.00"),
            discount: money("1.00"),
            total: money("26.00"),
        };
        assert!(check_totals(&items, &totals).is_ok());
    }

    #[test]
    fn test_check_totals_rejects_mismatched_total() {
        let items = vec![item(1, "10.00")];
        let totals = SaleTotals {
            subtotal: money("10.00"),
            tax: Money::ZERO,
            discount: Money::ZERO,
            total: money("12.00"),
        };
        assert!(matches!(
            check_totals(&items, &totals),
            Err(LedgerError::TotalsMismatch(_))
        ));
    }

    #[test]
    fn test_validate_line_items_rejects_zero_quantity() {
        let items = vec![item(1, "1.00"), item(0, "1.00")];
        assert!(matches!(
            validate_line_items(&items),
            Err(LedgerError::InvalidLineItem { index: 1, .. })
        ));
        assert!(validate_line_items(&[]).is_err());
    }

    #[test]
    fn test_settle_cash_sale_computes_change() {
        let s = settle_sale(PaymentMethod::Cash, money("18.00"), Some(money("20.00"))).unwrap();
        assert_eq!(s.change_amount, money("2.00"));
        assert!(s.remaining_balance.is_zero());
        assert!(settle_sale(PaymentMethod::Cash, money("18.00"), Some(money("10.00"))).is_err());
    }

    #[test]
    fn test_settle_credit_and_combined() {
        let credit = settle_sale(PaymentMethod::Credit, money("50.00"), None).unwrap();
        assert_eq!(credit.remaining_balance, money("50.00"));
        assert_eq!(credit.credit_increment, money("50.00"));

        let combined = settle_sale(PaymentMethod::Combined, money("50.00"), Some(money("20.00"))).unwrap();
        assert_eq!(combined.cash_received, money("20.00"));
        assert_eq!(combined.remaining_balance, money("30.00"));
    }

    #[test]
    fn test_payment_breakdown_description() {
        let b = payment_breakdown(
            PaymentMethod::Combined,
            money("100.00"),
            money("40.00"),
            money("60.00"),
        );
        assert_eq!(b.description, "Paid: $40.00 up front, $60.00 on credit");
    }

    #[test]
    fn test_stock_decrements_merge_repeated_products() {
        let id = Uuid::new_v4();
        let items = vec![
            SaleLineItem { product_id: id, quantity: 2, unit_price: money("1.00") },
            SaleLineItem { product_id: id, quantity: 3, unit_price: money("1.00") },
        ];
        assert_eq!(stock_decrements(&items).unwrap(), vec![(id, 5)]);
    }

    #[test]
    fn test_stock_decrements_reject_quantity_overflow() {
        let id = Uuid::new_v4();
        let items = vec![
            SaleLineItem { product_id: id, quantity: i32::MAX, unit_price: Money::ZERO },
            SaleLineItem { product_id: id, quantity: 1, unit_price: Money::ZERO },
        ];
        assert!(matches!(
            stock_decrements(&items),
            Err(LedgerError::InvalidLineItem { index: 1, .. })
        ));
    }
}

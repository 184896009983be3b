//! Credit payment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CollectionMethod, PaymentMethod};
use crate::money::Money;

/// One application of a collected amount against one sale's outstanding balance.
/// Never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sale_id: Uuid,
    pub amount: Money,
    pub payment_method: CollectionMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payment history row joined with its sale's customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPaymentEntry {
    #[serde(flatten)]
    pub payment: CreditPayment,
    pub customer_name: String,
    pub customer_document: String,
}

/// A sale with an outstanding balance, as listed to the cashier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingCreditSale {
    pub sale_id: Uuid,
    pub customer_document: String,
    pub customer_name: String,
    pub total: Money,
    pub cash_received: Money,
    pub remaining_balance: Money,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// Outstanding sales of one customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreditGroup {
    pub customer_document: String,
    pub customer_name: String,
    pub total_pending: Money,
    pub sales: Vec<OutstandingCreditSale>,
}

/// Group outstanding sales by customer document.
///
/// Groups keep the order in which each document first appears, and sales keep
/// their input order within a group.
pub fn group_by_customer(sales: Vec<OutstandingCreditSale>) -> Vec<CustomerCreditGroup> {
    let mut groups: Vec<CustomerCreditGroup> = Vec::new();

    for sale in sales {
        match groups
            .iter_mut()
            .find(|g| g.customer_document == sale.customer_document)
        {
            Some(group) => {
                group.total_pending += sale.remaining_balance;
                group.sales.push(sale);
            }
            None => groups.push(CustomerCreditGroup {
                customer_document: sale.customer_document.clone(),
                customer_name: sale.customer_name.clone(),
                total_pending: sale.remaining_balance,
                sales: vec![sale],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(document: &str, remaining: i64) -> OutstandingCreditSale {
        OutstandingCreditSale {
            sale_id: Uuid::new_v4(),
            customer_document: document.to_string(),
            customer_name: format!("Customer {}", document),
            total: Money::from_minor(remaining),
            cash_received: Money::ZERO,
            remaining_balance: Money::from_minor(remaining),
            payment_method: PaymentMethod::Credit,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_customer_sums_pending() {
        let groups = group_by_customer(vec![
            sale("100", 1000),
            sale("200", 500),
            sale("100", 250),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].customer_document, "100");
        assert_eq!(groups[0].total_pending, Money::from_minor(1250));
        assert_eq!(groups[0].sales.len(), 2);
        assert_eq!(groups[1].total_pending, Money::from_minor(500));
    }
}

//! Credit allocation engine: distributes a customer payment across outstanding
//! sales oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;

/// Largest recorded/computed balance difference treated as rounding noise
pub const BALANCE_TOLERANCE: Money = Money::from_minor(1);

/// A sale still owing money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingSale {
    pub sale_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub remaining_balance: Money,
}

/// Portion of a payment applied to one sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAllocation {
    pub sale_id: Uuid,
    pub amount_applied: Money,
    pub previous_balance: Money,
    pub remaining_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// One entry per touched sale, in application order
    pub allocations: Vec<SaleAllocation>,
    pub amount_applied: Money,
    pub outstanding_before: Money,
    pub outstanding_after: Money,
}

pub fn total_outstanding(sales: &[OutstandingSale]) -> Money {
    sales
        .iter()
        .filter(|s| s.remaining_balance.is_positive())
        .map(|s| s.remaining_balance)
        .sum()
}

/// Plan a payment across `sales`, oldest `created_at` first (ties by sale id).
///
/// Each touched sale receives `min(pool, remaining_balance)`. Rejects a
/// non-positive amount, a customer with nothing owed, and any amount above the
/// total outstanding.
pub fn plan_fifo_allocation(sales: &[OutstandingSale], amount: Money) -> LedgerResult<AllocationPlan> {
    if !amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount { field: "amount" });
    }

    let mut candidates: Vec<&OutstandingSale> = sales
        .iter()
        .filter(|s| s.remaining_balance.is_positive())
        .collect();
    if candidates.is_empty() {
        return Err(LedgerError::NoOutstandingBalance);
    }
    candidates.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.sale_id.cmp(&b.sale_id))
    });

    let outstanding_before: Money = candidates.iter().map(|s| s.remaining_balance).sum();
    if amount > outstanding_before {
        return Err(LedgerError::AmountExceedsBalance {
            amount,
            outstanding: outstanding_before,
        });
    }

    let mut pool = amount;
    let mut allocations = Vec::new();
    for sale in candidates {
        if pool.is_zero() {
            break;
        }
        let applied = pool.min(sale.remaining_balance);
        pool -= applied;
        allocations.push(SaleAllocation {
            sale_id: sale.sale_id,
            amount_applied: applied,
            previous_balance: sale.remaining_balance,
            remaining_balance: sale.remaining_balance - applied,
        });
    }

    Ok(AllocationPlan {
        allocations,
        amount_applied: amount,
        outstanding_before,
        outstanding_after: outstanding_before - amount,
    })
}

/// Plan a payment against one explicit sale
pub fn plan_single_sale_allocation(sale: &OutstandingSale, amount: Money) -> LedgerResult<AllocationPlan> {
    plan_fifo_allocation(std::slice::from_ref(sale), amount)
}

/// A customer whose stored credit balance drifted from their sales
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub customer_id: Uuid,
    pub document: String,
    pub name: String,
    pub recorded_balance: Money,
    pub computed_balance: Money,
    pub difference: Money,
}

/// Compare a stored balance with the sum of outstanding sales
pub fn balance_discrepancy(
    customer_id: Uuid,
    document: &str,
    name: &str,
    recorded_balance: Money,
    computed_balance: Money,
) -> Option<BalanceDiscrepancy> {
    let difference = recorded_balance - computed_balance;
    let magnitude = if difference.is_negative() { -difference } else { difference };
    if magnitude <= BALANCE_TOLERANCE {
        return None;
    }
    Some(BalanceDiscrepancy {
        customer_id,
        document: document.to_string(),
        name: name.to_string(),
        recorded_balance,
        computed_balance,
        difference,
    })
}

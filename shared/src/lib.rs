//! Shared domain logic for the Caja POS backend
//!
//! Money primitives, domain models and the pure ledger engines (credit
//! allocation, fixed-cost apportionment, cash session reconciliation). Nothing
//! in this crate performs I/O.

pub mod allocation;
pub mod apportionment;
pub mod calendar;
pub mod error;
pub mod models;
pub mod money;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use allocation::{
    balance_discrepancy, plan_fifo_allocation, plan_single_sale_allocation, total_outstanding,
    AllocationPlan, BalanceDiscrepancy, OutstandingSale, SaleAllocation,
};
pub use calendar::{BusinessCalendar, DateRange};
pub use error::{LedgerError, LedgerResult};
pub use models::*;
pub use money::{split_payment, Money, PaymentSplit, MONEY_SCALE};
pub use reconciliation::{
    compute_figures, ensure_can_close, ensure_can_open, session_figures, DailyActivity,
    OpeningBalances, SessionFigures,
};
pub use types::*;
pub use validation::*;

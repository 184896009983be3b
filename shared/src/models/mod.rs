//! Domain models for the point-of-sale ledger

mod cash_session;
mod credit;
mod customer;
mod fixed_cost;
mod ingredient;
mod product;
mod purchase;
mod sale;
mod stock_movement;

pub use cash_session::*;
pub use credit::*;
pub use customer::*;
pub use fixed_cost::*;
pub use ingredient::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
pub use stock_movement::*;

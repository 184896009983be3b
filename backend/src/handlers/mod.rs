//! HTTP handlers. Each one extracts the tenant, builds its service and delegates.

pub mod cash_session;
pub mod credit;
pub mod customer;
pub mod fixed_cost;
pub mod health;
pub mod ingredient;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod stock_movement;

pub use cash_session::*;
pub use credit::*;
pub use customer::*;
pub use fixed_cost::*;
pub use health::*;
pub use ingredient::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
pub use stock_movement::*;

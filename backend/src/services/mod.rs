//! Business logic services for the Caja POS backend

pub mod apportionment;
pub mod cash_session;
pub mod credit;
pub mod customer;
pub mod fixed_cost;
pub mod ingredient;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod stock_movement;

pub use apportionment::ApportionmentService;
pub use cash_session::CashSessionService;
pub use credit::CreditService;
pub use customer::CustomerService;
pub use fixed_cost::FixedCostService;
pub use ingredient::IngredientService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use sale::SaleService;
pub use stock_movement::StockMovementService;

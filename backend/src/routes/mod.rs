//! Route definitions for the Caja POS API

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. Everything under them requires a bearer token.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/customers", customer_routes())
        .nest("/sales", sale_routes())
        .nest("/credits", credit_routes())
        .nest("/products", product_routes())
        .nest("/ingredients", ingredient_routes())
        .nest("/fixed-costs", fixed_cost_routes())
        .nest("/purchases", purchase_routes())
        .nest("/cash-sessions", cash_session_routes())
        .route("/stock-movements", get(handlers::list_stock_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Customer registry routes
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route("/:id/sales", get(handlers::get_customer_sales))
}

/// Sale routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/stats", get(handlers::get_sales_stats))
        .route("/:id", get(handlers::get_sale))
        .route("/:id/reverse", post(handlers::reverse_sale))
}

/// Credit sale and payment routes
fn credit_routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(handlers::list_credit_sales))
        .route(
            "/payments",
            get(handlers::list_credit_payments).post(handlers::register_credit_payment),
        )
        .route("/reconcile", post(handlers::reconcile_credit_balances))
        .route(
            "/sales/:id/payments",
            get(handlers::list_sale_credit_payments).post(handlers::register_sale_credit_payment),
        )
}

/// Product catalog and pricing routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/fixed-costs-manual", post(handlers::calculate_fixed_costs_manual))
        .route("/bundles", get(handlers::list_bundles).post(handlers::create_bundle))
        .route("/bundles/:id", delete(handlers::delete_bundle))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:id/fixed-cost-allocation", get(handlers::get_fixed_cost_allocation))
        .route("/:id/stock-movements", get(handlers::list_product_stock_movements))
}

/// Ingredient inventory routes
fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_ingredients).post(handlers::create_ingredient))
        .route("/low-stock", get(handlers::list_low_stock_ingredients))
        .route(
            "/:id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
        .route("/:id/add-stock", post(handlers::add_ingredient_stock))
        .route("/:id/reduce-stock", post(handlers::reduce_ingredient_stock))
}

/// Fixed cost routes
fn fixed_cost_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_fixed_costs).post(handlers::create_fixed_cost))
        .route("/stats", get(handlers::get_fixed_cost_stats))
        .route("/periods", get(handlers::list_fixed_costs_for_month))
        .route(
            "/:id",
            get(handlers::get_fixed_cost)
                .put(handlers::update_fixed_cost)
                .delete(handlers::delete_fixed_cost),
        )
        .route("/:id/toggle-payment", post(handlers::toggle_fixed_cost_payment))
        .route(
            "/:id/periods",
            get(handlers::list_fixed_cost_periods).put(handlers::set_fixed_cost_period),
        )
}

/// Purchase routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route("/stats", get(handlers::get_purchase_stats))
        .route("/categories", get(handlers::list_purchase_categories))
        .route(
            "/:id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
}

/// Cash register session routes
fn cash_session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_cash_sessions).post(handlers::open_cash_session))
        .route("/status", get(handlers::get_cash_session_status))
        .route("/close", post(handlers::close_cash_session))
        .route("/history", get(handlers::get_cash_session_history))
}

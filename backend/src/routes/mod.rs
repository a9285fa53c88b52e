//! Route definitions for the packhouse platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - catalogs
        .merge(catalog_routes(state))
        // Protected routes - harvest and receiving
        .nest("/harvests", harvest_routes(state))
        .nest("/incoming", incoming_routes(state))
        .nest("/batches", batch_routes(state))
        .nest("/food-safety", food_safety_routes(state))
        .nest("/packing", packing_routes(state))
        // Protected routes - purchasing
        .nest("/requisitions", requisition_routes(state))
        .nest("/purchase-orders", purchase_order_routes(state))
        .nest("/service-orders", service_order_routes(state))
        .nest("/fruit-purchase-orders", fruit_purchase_routes(state))
        .nest("/orders", order_money_routes(state))
        // Protected routes - supply inventory
        .nest("/inventory", inventory_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Catalog routes (protected)
fn catalog_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/markets", get(handlers::list_markets).post(handlers::create_market))
        .route("/markets/:id", put(handlers::update_market))
        .route("/markets/:id/enabled", put(handlers::set_market_enabled))
        .route(
            "/job-positions",
            get(handlers::list_job_positions).post(handlers::create_job_position),
        )
        .route("/job-positions/:id", put(handlers::update_job_position))
        .route("/job-positions/:id/enabled", put(handlers::set_job_position_enabled))
        .route("/orchards", get(handlers::list_orchards).post(handlers::create_orchard))
        .route("/orchards/:id", put(handlers::update_orchard))
        .route("/orchards/:id/enabled", put(handlers::set_orchard_enabled))
        .route("/providers", get(handlers::list_providers).post(handlers::create_provider))
        .route("/providers/:id", put(handlers::update_provider))
        .route("/providers/:id/enabled", put(handlers::set_provider_enabled))
        .route("/products", get(handlers::list_products).post(handlers::create_product))
        .route("/products/:id", put(handlers::update_product))
        .route("/products/:id/enabled", put(handlers::set_product_enabled))
        .route("/supplies", get(handlers::list_supplies).post(handlers::create_supply))
        .route("/supplies/:id", get(handlers::get_supply).put(handlers::update_supply))
        .route("/supplies/:id/enabled", put(handlers::set_supply_enabled))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Schedule harvest routes (protected)
fn harvest_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_harvests).post(handlers::create_harvest))
        .route(
            "/:harvest_id",
            get(handlers::get_harvest).put(handlers::update_harvest),
        )
        .route("/:harvest_id/status", put(handlers::set_harvest_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Incoming product routes (protected)
fn incoming_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_incoming).post(handlers::receive_incoming))
        .route("/:incoming_id", get(handlers::get_incoming))
        .route("/:incoming_id/weighing-sets", post(handlers::add_weighing))
        .route(
            "/:incoming_id/weighing-sets/:set_id",
            delete(handlers::remove_weighing),
        )
        .route("/:incoming_id/decision", put(handlers::decide_incoming))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Batch routes (protected)
fn batch_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/merge", post(handlers::merge_batches))
        .route("/:batch_id/status", put(handlers::set_batch_status))
        .route("/:batch_id/samples", get(handlers::list_batch_samples))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Food safety routes (protected)
fn food_safety_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/samples", post(handlers::take_sample))
        .route("/samples/:sample_id/result", put(handlers::record_sample_result))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Packing routes (protected)
fn packing_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/packages", get(handlers::list_packages).post(handlers::create_package))
        .route("/packages/:package_id", delete(handlers::delete_package))
        .route("/pallets", get(handlers::list_pallets).post(handlers::create_pallet))
        .route("/pallets/:pallet_id", get(handlers::get_pallet))
        .route("/pallets/:pallet_id/packages", post(handlers::assign_packages))
        .route(
            "/pallets/:pallet_id/packages/:package_id",
            delete(handlers::unassign_package),
        )
        .route("/pallets/:pallet_id/close", post(handlers::close_pallet))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Requisition routes (protected)
fn requisition_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_requisitions).post(handlers::create_requisition))
        .route("/:id", get(handlers::get_requisition))
        .route("/:id/lines", post(handlers::add_requisition_line))
        .route("/:id/lines/:line_id", delete(handlers::remove_requisition_line))
        .route("/:id/status", put(handlers::set_requisition_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Purchase order routes (protected)
fn purchase_order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:id", get(handlers::get_purchase_order))
        .route("/:id/lines", post(handlers::add_purchase_order_line))
        .route("/:id/lines/:line_id", delete(handlers::remove_purchase_order_line))
        .route("/:id/status", put(handlers::set_purchase_order_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Service order routes (protected)
fn service_order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_service_orders).post(handlers::create_service_order),
        )
        .route("/:id", get(handlers::get_service_order))
        .route("/:id/lines", post(handlers::add_service_order_line))
        .route("/:id/lines/:line_id", delete(handlers::remove_service_order_line))
        .route("/:id/status", put(handlers::set_service_order_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Fruit purchase order routes (protected)
fn fruit_purchase_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_fruit_purchases).post(handlers::create_fruit_purchase),
        )
        .route("/:id", get(handlers::get_fruit_purchase))
        .route("/:id/receipts", post(handlers::add_fruit_receipt))
        .route("/:id/receipts/:receipt_id", delete(handlers::remove_fruit_receipt))
        .route("/:id/status", put(handlers::set_fruit_purchase_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Charges, deductions and payments of any order kind (protected)
fn order_money_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/:kind/:order_id/money", get(handlers::get_order_money))
        .route("/:kind/:order_id/charges", post(handlers::add_order_charge))
        .route(
            "/:kind/:order_id/charges/:charge_id",
            delete(handlers::remove_order_charge),
        )
        .route("/:kind/:order_id/deductions", post(handlers::add_order_deduction))
        .route(
            "/:kind/:order_id/deductions/:deduction_id",
            delete(handlers::remove_order_deduction),
        )
        .route("/:kind/:order_id/payments", post(handlers::add_order_payment))
        .route(
            "/:kind/:order_id/payments/:payment_id/cancel",
            post(handlers::cancel_order_payment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Supply inventory routes (protected)
fn inventory_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Storehouse entries
        .route(
            "/entries",
            get(handlers::list_storehouse_entries).post(handlers::create_storehouse_entry),
        )
        .route("/entries/:entry_id", get(handlers::get_storehouse_entry))
        // Consumption and adjustments
        .route("/consume", post(handlers::consume_supply))
        .route(
            "/adjustments",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        // Stock position
        .route("/balances", get(handlers::list_balances))
        .route("/supplies/:supply_id/balance", get(handlers::get_balance))
        .route("/supplies/:supply_id/kardex", get(handlers::get_kardex))
        .route("/supplies/:supply_id/lots", get(handlers::get_open_lots))
        .route(
            "/supplies/:supply_id/transactions",
            get(handlers::list_supply_transactions),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

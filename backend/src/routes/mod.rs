//! Route definitions for the Site Inventory Ledger

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/products", product_routes())
        .nest("/sites", site_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/movements", movement_routes())
        .nest("/shopping-lists", shopping_list_routes())
        .nest("/reports", report_routes())
}

/// Product catalog and stock routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/low-stock", get(handlers::list_low_stock))
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route("/:product_id/stock", get(handlers::get_product_stock))
}

/// Site routes
fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sites).post(handlers::create_site))
        .route(
            "/:site_id",
            get(handlers::get_site).put(handlers::update_site),
        )
        .route("/:site_id/inventory", get(handlers::get_site_inventory))
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

/// Movement ledger routes. Movements are append-only: no update or delete.
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/:movement_id", get(handlers::get_movement))
}

/// Shopping list routes
fn shopping_list_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_shopping_lists).post(handlers::create_shopping_list),
        )
        .route("/:list_id", get(handlers::get_shopping_list))
        .route("/:list_id/status", post(handlers::set_shopping_list_status))
        .route(
            "/:list_id/items/:item_id",
            patch(handlers::set_item_purchased),
        )
}

/// Read-only reports
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/outflows", get(handlers::list_outflows))
        .route("/warehouses", get(handlers::list_warehouse_values))
        .route("/unit-costs", get(handlers::list_unit_costs))
}

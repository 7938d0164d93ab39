//! HTTP handlers for product endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::Product;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{CatalogService, CreateProductInput, UpdateProductInput};
use crate::services::stock::{LowStockProduct, ProductStockOverview, StockService};
use crate::AppState;

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// List all products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.store);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product's descriptive fields
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.store);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Global stock, health and per-site breakdown of a product
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductStockOverview>> {
    let service = StockService::new(state.store);
    let overview = service.product_overview(product_id).await?;
    Ok(Json(overview))
}

/// Products at or under their reorder threshold
pub async fn list_low_stock(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LowStockProduct>>> {
    let service = StockService::new(state.store);
    let products = service.low_stock_products().await?;
    Ok(Json(products))
}

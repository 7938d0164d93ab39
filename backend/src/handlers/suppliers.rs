//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Supplier;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{CatalogService, CreateSupplierInput, UpdateSupplierInput};
use crate::AppState;

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = CatalogService::new(state.store);
    let supplier = service.create_supplier(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// List suppliers by name
pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let service = CatalogService::new(state.store);
    let suppliers = service.list_suppliers().await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.store);
    let supplier = service.get_supplier(supplier_id).await?;
    Ok(Json(supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.store);
    let supplier = service.update_supplier(supplier_id, input).await?;
    Ok(Json(supplier))
}

/// Delete a supplier; its products lose the link
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.store);
    service.delete_supplier(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

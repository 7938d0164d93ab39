//! HTTP handlers for site endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::Site;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{CatalogService, CreateSiteInput, UpdateSiteInput};
use crate::services::stock::{SiteInventory, StockService};
use crate::AppState;

/// Create a site
pub async fn create_site(
    State(state): State<AppState>,
    Json(input): Json<CreateSiteInput>,
) -> AppResult<Json<Site>> {
    let service = CatalogService::new(state.store);
    let site = service.create_site(input).await?;
    Ok(Json(site))
}

/// List all sites
pub async fn list_sites(State(state): State<AppState>) -> AppResult<Json<Vec<Site>>> {
    let service = CatalogService::new(state.store);
    let sites = service.list_sites().await?;
    Ok(Json(sites))
}

/// Get a site by ID
pub async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> AppResult<Json<Site>> {
    let service = CatalogService::new(state.store);
    let site = service.get_site(site_id).await?;
    Ok(Json(site))
}

/// Update a site
pub async fn update_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(input): Json<UpdateSiteInput>,
) -> AppResult<Json<Site>> {
    let service = CatalogService::new(state.store);
    let site = service.update_site(site_id, input).await?;
    Ok(Json(site))
}

/// Stock held at a site, valued at sale price
pub async fn get_site_inventory(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> AppResult<Json<SiteInventory>> {
    let service = StockService::new(state.store);
    let inventory = service.site_inventory(site_id).await?;
    Ok(Json(inventory))
}

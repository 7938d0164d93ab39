//! HTTP handlers for dashboard and financial reports

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::services::stock::{
    DashboardSummary, OutflowSummary, ReportRange, SiteValue, StockService, UnitCost,
};
use crate::AppState;

/// Headline inventory figures
pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardSummary>> {
    let service = StockService::new(state.store);
    let summary = service.dashboard_summary().await?;
    Ok(Json(summary))
}

/// Outgoing stock per reference, optionally bounded by `from` and `to`
pub async fn list_outflows(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> AppResult<Json<Vec<OutflowSummary>>> {
    let service = StockService::new(state.store);
    let outflows = service.outflows_by_reference(range).await?;
    Ok(Json(outflows))
}

pub async fn list_warehouse_values(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SiteValue>>> {
    let service = StockService::new(state.store);
    let values = service.warehouse_values().await?;
    Ok(Json(values))
}

/// Cost delivered to each unit, optionally bounded by `from` and `to`
pub async fn list_unit_costs(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> AppResult<Json<Vec<UnitCost>>> {
    let service = StockService::new(state.store);
    let costs = service.unit_costs(range).await?;
    Ok(Json(costs))
}

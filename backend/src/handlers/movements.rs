//! HTTP handlers for the movement ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::Movement;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::ledger::{LedgerService, MovementReceipt, RecordMovementInput};
use crate::store::MovementFilter;
use crate::AppState;

fn ledger(state: AppState) -> LedgerService {
    LedgerService::new(state.store, state.config.ledger.reference_attempts)
}

/// Record a movement
pub async fn record_movement(
    State(state): State<AppState>,
    CurrentActor(actor_id): CurrentActor,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<MovementReceipt>)> {
    let receipt = ledger(state).record_movement(input, actor_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Movement history, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<Movement>>> {
    let movements = ledger(state).list_movements(filter).await?;
    Ok(Json(movements))
}

/// Get a movement by ID
pub async fn get_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<Movement>> {
    let movement = ledger(state).get_movement(movement_id).await?;
    Ok(Json(movement))
}

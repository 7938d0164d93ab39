//! HTTP handlers for shopping lists

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{ShoppingList, ShoppingListSummary};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::shopping_list::{
    CreateShoppingListInput, SetPurchasedInput, SetStatusInput, ShoppingListService,
};
use crate::AppState;

/// Snapshot selected under-threshold products into a new list
pub async fn create_shopping_list(
    State(state): State<AppState>,
    CurrentActor(owner_id): CurrentActor,
    Json(input): Json<CreateShoppingListInput>,
) -> AppResult<(StatusCode, Json<ShoppingList>)> {
    let service = ShoppingListService::new(state.store);
    let list = service.create_shopping_list(owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// List shopping lists, newest first, summarized
pub async fn list_shopping_lists(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ShoppingListSummary>>> {
    let service = ShoppingListService::new(state.store);
    let lists = service.list_shopping_lists().await?;
    Ok(Json(lists.iter().map(ShoppingListSummary::from).collect()))
}

/// Get a shopping list with its items
pub async fn get_shopping_list(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<ShoppingList>> {
    let service = ShoppingListService::new(state.store);
    let list = service.get_shopping_list(list_id).await?;
    Ok(Json(list))
}

/// Change a list's status
pub async fn set_shopping_list_status(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
    Json(input): Json<SetStatusInput>,
) -> AppResult<Json<ShoppingList>> {
    let service = ShoppingListService::new(state.store);
    let list = service.set_status(list_id, input.status).await?;
    Ok(Json(list))
}

/// Mark an item purchased or not
pub async fn set_item_purchased(
    State(state): State<AppState>,
    Path((list_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<SetPurchasedInput>,
) -> AppResult<Json<ShoppingList>> {
    let service = ShoppingListService::new(state.store);
    let list = service
        .set_item_purchased(list_id, item_id, input.purchased)
        .await?;
    Ok(Json(list))
}

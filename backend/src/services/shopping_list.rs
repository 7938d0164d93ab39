//! Shopping list snapshots of under-threshold products

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{
    generate_shopping_list_code, suggested_quantity, ShoppingList, ShoppingListItem,
    ShoppingListStatus,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

const CODE_ATTEMPTS: u32 = 5;

/// Shopping list service
#[derive(Clone)]
pub struct ShoppingListService {
    store: Arc<dyn InventoryStore>,
}

/// Input for creating a shopping list
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShoppingListInput {
    pub product_ids: Vec<Uuid>,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Input for toggling an item's purchased flag
#[derive(Debug, Clone, Deserialize)]
pub struct SetPurchasedInput {
    pub purchased: bool,
}

/// Input for changing a list's status
#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusInput {
    pub status: ShoppingListStatus,
}

impl ShoppingListService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Snapshot the selected products that are at or under their threshold.
    ///
    /// Products above threshold are skipped. Nothing is reserved; later
    /// movements do not change the list.
    #[tracing::instrument(skip(self, input), fields(selected = input.product_ids.len()))]
    pub async fn create_shopping_list(
        &self,
        owner_id: Option<Uuid>,
        input: CreateShoppingListInput,
    ) -> AppResult<ShoppingList> {
        input.validate()?;

        let selected: BTreeSet<Uuid> = input.product_ids.into_iter().collect();
        if selected.is_empty() {
            return Err(AppError::Validation {
                field: "product_ids".to_string(),
                message: "Select at least one product".to_string(),
            });
        }

        let list_id = Uuid::new_v4();
        let mut items = Vec::new();
        for product_id in selected {
            let product = self
                .store
                .get_product(product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Product", product_id))?;

            if !product.needs_restock() {
                tracing::debug!(code = %product.code, "Skipping product above threshold");
                continue;
            }

            items.push(ShoppingListItem {
                id: Uuid::new_v4(),
                list_id,
                product_id: product.id,
                suggested_quantity: suggested_quantity(product.min_stock, product.global_stock),
                product_name: product.name,
                purchased: false,
            });
        }

        if items.is_empty() {
            return Err(AppError::Validation {
                field: "product_ids".to_string(),
                message: "None of the selected products is at or below its reorder threshold"
                    .to_string(),
            });
        }

        let created_at = Utc::now();
        let mut list = ShoppingList {
            id: list_id,
            code: generate_shopping_list_code(created_at.date_naive()),
            status: ShoppingListStatus::Pending,
            owner_id,
            note: input
                .note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
            items,
            created_at,
        };

        // List codes carry a short token; regenerate on the rare collision
        let mut attempt = 1;
        loop {
            match self.store.insert_shopping_list(&list).await {
                Ok(()) => break,
                Err(AppError::DuplicateEntry(_)) if attempt < CODE_ATTEMPTS => {
                    tracing::warn!(code = %list.code, "Shopping list code collided, retrying");
                    list.code = generate_shopping_list_code(created_at.date_naive());
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
        tracing::info!(code = %list.code, items = list.items.len(), "Shopping list created");

        Ok(list)
    }

    pub async fn get_shopping_list(&self, id: Uuid) -> AppResult<ShoppingList> {
        self.store
            .get_shopping_list(id)
            .await?
            .ok_or_else(|| AppError::not_found("Shopping list", id))
    }

    /// All lists, newest first
    pub async fn list_shopping_lists(&self) -> AppResult<Vec<ShoppingList>> {
        self.store.list_shopping_lists().await
    }

    pub async fn set_item_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> AppResult<ShoppingList> {
        if !self
            .store
            .set_item_purchased(list_id, item_id, purchased)
            .await?
        {
            return Err(AppError::not_found("Shopping list item", item_id));
        }
        self.get_shopping_list(list_id).await
    }

    pub async fn set_status(
        &self,
        list_id: Uuid,
        status: ShoppingListStatus,
    ) -> AppResult<ShoppingList> {
        if !self.store.set_shopping_list_status(list_id, status).await? {
            return Err(AppError::not_found("Shopping list", list_id));
        }
        tracing::info!(%list_id, status = status.as_str(), "Shopping list status changed");
        self.get_shopping_list(list_id).await
    }
}

//! Shopping list tests
//!
//! Tests for shopping list snapshots including:
//! - Suggested quantity = max(1, threshold - global stock)
//! - Products above threshold are skipped
//! - Lists do not follow later stock changes

mod common;

use common::Fixture;
use inventory_server::services::ledger::RecordMovementInput;
use inventory_server::services::shopping_list::CreateShoppingListInput;
use inventory_server::AppError;
use shared::{MovementKind, ShoppingListStatus};
use uuid::Uuid;

fn select(product_ids: Vec<Uuid>) -> CreateShoppingListInput {
    CreateShoppingListInput {
        product_ids,
        note: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario 6: threshold 5, global stock 0 suggests 5
    #[tokio::test]
    async fn test_snapshot_after_stock_runs_out() {
        let fx = Fixture::new();
        let p1 = fx.product("P1", 5).await;
        let a = fx.site("A").await;
        fx.receive(&p1, &a, 4).await;
        fx.record(
            RecordMovementInput::new(p1.id, MovementKind::AdjustmentNegative, 4).from_site(a.id),
        )
        .await
        .unwrap();

        let owner = Uuid::new_v4();
        let list = fx
            .lists
            .create_shopping_list(Some(owner), select(vec![p1.id]))
            .await
            .unwrap();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].product_id, p1.id);
        assert_eq!(list.items[0].suggested_quantity, 5);
        assert!(!list.items[0].purchased);
        assert_eq!(list.owner_id, Some(owner));
        assert_eq!(list.status, ShoppingListStatus::Pending);
        assert!(list.code.starts_with("SHOP-"));
    }

    #[tokio::test]
    async fn test_suggestion_floor_and_skips() {
        let fx = Fixture::new();
        let at_threshold = fx.product("AT-1", 5).await;
        let above = fx.product("ABOVE-1", 2).await;
        let partial = fx.product("PART-1", 10).await;
        let a = fx.site("A").await;
        fx.receive(&at_threshold, &a, 5).await;
        fx.receive(&above, &a, 9).await;
        fx.receive(&partial, &a, 7).await;

        let list = fx
            .lists
            .create_shopping_list(None, select(vec![at_threshold.id, above.id, partial.id]))
            .await
            .unwrap();

        assert_eq!(list.items.len(), 2);
        let suggested = |id: Uuid| {
            list.items
                .iter()
                .find(|item| item.product_id == id)
                .map(|item| item.suggested_quantity)
        };
        assert_eq!(suggested(at_threshold.id), Some(1));
        assert_eq!(suggested(partial.id), Some(3));
        assert_eq!(suggested(above.id), None);
        assert_eq!(list.total_suggested(), 4);
    }

    #[tokio::test]
    async fn test_empty_or_unqualified_selection_rejected() {
        let fx = Fixture::new();
        let healthy = fx.product("OK-1", 1).await;
        let a = fx.site("A").await;
        fx.receive(&healthy, &a, 10).await;

        let err = fx
            .lists
            .create_shopping_list(None, select(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = fx
            .lists
            .create_shopping_list(None, select(vec![healthy.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = fx
            .lists
            .create_shopping_list(None, select(vec![healthy.id, Uuid::new_v4()]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(fx.lists.list_shopping_lists().await.unwrap().is_empty());
    }

    /// Later movements do not change an existing list
    #[tokio::test]
    async fn test_snapshot_is_point_in_time() {
        let fx = Fixture::new();
        let product = fx.product("SNAP-1", 8).await;
        let a = fx.site("A").await;
        fx.receive(&product, &a, 2).await;

        let list = fx
            .lists
            .create_shopping_list(None, select(vec![product.id]))
            .await
            .unwrap();
        assert_eq!(list.items[0].suggested_quantity, 6);

        fx.receive(&product, &a, 20).await;

        let stored = fx.lists.get_shopping_list(list.id).await.unwrap();
        assert_eq!(stored.items[0].suggested_quantity, 6);
        assert_eq!(fx.global_stock(&product).await, 22);
    }

    #[tokio::test]
    async fn test_duplicate_ids_collapse() {
        let fx = Fixture::new();
        let product = fx.product("DUPSEL-1", 3).await;

        let list = fx
            .lists
            .create_shopping_list(None, select(vec![product.id, product.id]))
            .await
            .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].suggested_quantity, 3);
    }

    #[tokio::test]
    async fn test_mark_items_and_status() {
        let fx = Fixture::new();
        let p1 = fx.product("MARK-1", 3).await;
        let p2 = fx.product("MARK-2", 4).await;

        let list = fx
            .lists
            .create_shopping_list(
                None,
                CreateShoppingListInput {
                    product_ids: vec![p1.id, p2.id],
                    note: Some("  Weekly restock ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(list.note.as_deref(), Some("Weekly restock"));

        let item_id = list.items[0].id;
        let updated = fx
            .lists
            .set_item_purchased(list.id, item_id, true)
            .await
            .unwrap();
        assert_eq!(updated.pending_items().count(), 1);
        assert!(updated.items.iter().any(|item| item.id == item_id && item.purchased));

        let err = fx
            .lists
            .set_item_purchased(list.id, Uuid::new_v4(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let completed = fx
            .lists
            .set_status(list.id, ShoppingListStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, ShoppingListStatus::Completed);

        let err = fx
            .lists
            .set_status(Uuid::new_v4(), ShoppingListStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lists_newest_first() {
        let fx = Fixture::new();
        let product = fx.product("ORD-1", 3).await;

        let first = fx
            .lists
            .create_shopping_list(None, select(vec![product.id]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = fx
            .lists
            .create_shopping_list(None, select(vec![product.id]))
            .await
            .unwrap();

        let lists = fx.lists.list_shopping_lists().await.unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].id, second.id);
        assert_eq!(lists[1].id, first.id);
    }
}

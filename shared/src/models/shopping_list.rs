//! Shopping list snapshots of under-threshold products

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{random_token, short_date};

/// Point-in-time purchase list. Items do not follow later stock changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingList {
    pub id: Uuid,
    /// Human-readable list code (e.g., "SHOP-240307-7C1E")
    pub code: String,
    pub status: ShoppingListStatus,
    pub owner_id: Option<Uuid>,
    pub note: Option<String>,
    pub items: Vec<ShoppingListItem>,
    pub created_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn pending_items(&self) -> impl Iterator<Item = &ShoppingListItem> {
        self.items.iter().filter(|item| !item.purchased)
    }

    pub fn total_suggested(&self) -> i64 {
        self.items
            .iter()
            .map(|item| i64::from(item.suggested_quantity))
            .sum()
    }
}

/// Index view of a shopping list with counts instead of items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListSummary {
    pub id: Uuid,
    pub code: String,
    pub status: ShoppingListStatus,
    pub owner_id: Option<Uuid>,
    pub item_count: usize,
    pub pending_items: usize,
    pub total_suggested: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&ShoppingList> for ShoppingListSummary {
    fn from(list: &ShoppingList) -> Self {
        Self {
            id: list.id,
            code: list.code.clone(),
            status: list.status,
            owner_id: list.owner_id,
            item_count: list.items.len(),
            pending_items: list.pending_items().count(),
            total_suggested: list.total_suggested(),
            created_at: list.created_at,
        }
    }
}

/// A product on a shopping list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub suggested_quantity: i32,
    pub purchased: bool,
}

/// Status of a shopping list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShoppingListStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl ShoppingListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShoppingListStatus::Pending => "PENDING",
            ShoppingListStatus::Completed => "COMPLETED",
            ShoppingListStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for ShoppingListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ShoppingListStatus::Pending),
            "COMPLETED" => Ok(ShoppingListStatus::Completed),
            "CANCELLED" => Ok(ShoppingListStatus::Cancelled),
            other => Err(format!("unknown shopping list status: {}", other)),
        }
    }
}

/// Generate a list code: `SHOP-{YYMMDD}-{TOKEN}`
pub fn generate_shopping_list_code(created_on: NaiveDate) -> String {
    format!("SHOP-{}-{}", short_date(created_on), random_token(4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_code_format() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let code = generate_shopping_list_code(date);
        assert!(code.starts_with("SHOP-251130-"));
        assert_eq!(code.len(), "SHOP-251130-".len() + 4);
    }

    #[test]
    fn test_pending_items_and_totals() {
        let list_id = Uuid::new_v4();
        let item = |qty: i32, purchased: bool| ShoppingListItem {
            id: Uuid::new_v4(),
            list_id,
            product_id: Uuid::new_v4(),
            product_name: "Towel".to_string(),
            suggested_quantity: qty,
            purchased,
        };
        let list = ShoppingList {
            id: list_id,
            code: "SHOP-251130-ABCD".to_string(),
            status: ShoppingListStatus::Pending,
            owner_id: None,
            note: None,
            items: vec![item(5, false), item(2, true), item(1, false)],
            created_at: Utc::now(),
        };

        assert_eq!(list.pending_items().count(), 2);
        assert_eq!(list.total_suggested(), 8);

        let summary = ShoppingListSummary::from(&list);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.pending_items, 2);
        assert_eq!(summary.total_suggested, 8);
        assert_eq!(summary.code, list.code);
    }
}

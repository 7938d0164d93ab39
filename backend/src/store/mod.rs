//! Persistence for products, sites, site stock, movements and shopping lists.
//!
//! Implementations:
//! - `PostgresStore`: PostgreSQL via sqlx, row-level locks
//! - `MemoryStore`: in-process maps guarded by keyed async mutexes
//!
//! Site stock and the product aggregate are only written through a
//! [`MovementTransaction`], which the ledger opens per movement.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{
    Movement, MovementKind, Product, ShoppingList, ShoppingListStatus, Site, SiteStock, StockKey,
    Supplier,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Filters for movement history queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<MovementKind>,
    pub product_id: Option<Uuid>,
    /// Movements whose origin or destination is this site
    pub site_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.from.map_or(true, |from| movement.movement_date >= from)
            && self.to.map_or(true, |to| movement.movement_date <= to)
            && self.kind.map_or(true, |kind| movement.kind == kind)
            && self
                .product_id
                .map_or(true, |id| movement.product_id == id)
            && self.site_id.map_or(true, |id| {
                movement.origin_site_id == Some(id) || movement.destination_site_id == Some(id)
            })
    }
}

/// Storage interface used by the services.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // Catalog

    /// Insert a product. Fails with `DuplicateEntry` when the code is taken.
    async fn insert_product(&self, product: &Product) -> AppResult<()>;

    /// Update descriptive fields. Never touches `global_stock`.
    async fn update_product(&self, product: &Product) -> AppResult<()>;

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// All products ordered by name
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    async fn insert_site(&self, site: &Site) -> AppResult<()>;

    async fn update_site(&self, site: &Site) -> AppResult<()>;

    async fn get_site(&self, id: Uuid) -> AppResult<Option<Site>>;

    /// All sites ordered by name
    async fn list_sites(&self) -> AppResult<Vec<Site>>;

    async fn insert_supplier(&self, supplier: &Supplier) -> AppResult<()>;

    async fn update_supplier(&self, supplier: &Supplier) -> AppResult<()>;

    async fn get_supplier(&self, id: Uuid) -> AppResult<Option<Supplier>>;

    /// All suppliers ordered by name
    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>>;

    /// Remove a supplier and clear it from its products.
    /// Returns false when the supplier does not exist.
    async fn delete_supplier(&self, id: Uuid) -> AppResult<bool>;

    // Site stock (read-only outside a movement transaction)

    async fn stock_for_product(&self, product_id: Uuid) -> AppResult<Vec<SiteStock>>;

    async fn stock_for_site(&self, site_id: Uuid) -> AppResult<Vec<SiteStock>>;

    async fn stock_at(&self, key: StockKey) -> AppResult<Option<SiteStock>>;

    // Movements

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>>;

    /// Movements matching `filter`, newest first
    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>>;

    /// Open the atomic unit for one movement of `product_id` touching `sites`.
    ///
    /// `sites` must be sorted; stock rows are locked in that order.
    async fn begin_movement(
        &self,
        product_id: Uuid,
        sites: &[Uuid],
    ) -> AppResult<Box<dyn MovementTransaction>>;

    // Shopping lists

    async fn insert_shopping_list(&self, list: &ShoppingList) -> AppResult<()>;

    async fn get_shopping_list(&self, id: Uuid) -> AppResult<Option<ShoppingList>>;

    /// All lists, newest first
    async fn list_shopping_lists(&self) -> AppResult<Vec<ShoppingList>>;

    /// Returns false when the item does not belong to the list
    async fn set_item_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> AppResult<bool>;

    /// Returns false when the list does not exist
    async fn set_shopping_list_status(
        &self,
        list_id: Uuid,
        status: ShoppingListStatus,
    ) -> AppResult<bool>;

    /// Connectivity check for the health endpoint
    async fn ping(&self) -> AppResult<()>;
}

/// One movement's atomic unit of work, bound to a single product.
///
/// Dropping the transaction without calling `commit` discards every change.
#[async_trait]
pub trait MovementTransaction: Send {
    /// Current quantity at `site_id`, locked until the transaction ends
    async fn site_stock_for_update(&mut self, site_id: Uuid) -> AppResult<Option<i32>>;

    /// Subtract from an existing row. The caller has checked availability.
    async fn debit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32>;

    /// Fetch-or-create the row for `site_id` and add to it
    async fn credit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32>;

    /// Lock the product aggregate and set it to the sum of all its stock rows
    async fn recompute_global_stock(&mut self) -> AppResult<i64>;

    /// Fails with `DuplicateReference` when the reference is taken
    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

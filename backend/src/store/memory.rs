//! In-process store.
//!
//! Each (product, site) pair has its own async mutex; a movement takes the
//! mutexes of every site it touches in sorted order and holds them until it
//! commits or is dropped. The product aggregate has a separate mutex taken
//! just before re-aggregation, so movements on disjoint pairs only serialise
//! for the final recompute-and-commit step.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use shared::{
    Movement, Product, ShoppingList, ShoppingListStatus, Site, SiteStock, StockKey, Supplier,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{InventoryStore, MovementFilter, MovementTransaction};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    sites: HashMap<Uuid, Site>,
    suppliers: HashMap<Uuid, Supplier>,
    stock: BTreeMap<StockKey, i32>,
    movements: Vec<Movement>,
    shopping_lists: HashMap<Uuid, ShoppingList>,
}

impl MemoryState {
    fn reference_taken(&self, reference: &str) -> bool {
        self.movements.iter().any(|m| m.reference == reference)
    }
}

#[derive(Default)]
struct MemoryInner {
    state: RwLock<MemoryState>,
    row_locks: DashMap<StockKey, Arc<Mutex<()>>>,
    aggregate_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    fail_next_commit: AtomicBool,
}

/// Store holding everything in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next movement commit fail with a storage error
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }

    async fn lock_row(&self, key: StockKey) -> OwnedMutexGuard<()> {
        let lock = self.inner.row_locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        if state.products.values().any(|p| p.code == product.code) {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        if state
            .products
            .values()
            .any(|p| p.code == product.code && p.id != product.id)
        {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        let existing = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| AppError::not_found("Product", product.id))?;

        *existing = Product {
            global_stock: existing.global_stock,
            created_at: existing.created_at,
            ..product.clone()
        };
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.inner.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let state = self.inner.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(products)
    }

    async fn insert_site(&self, site: &Site) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        state.sites.insert(site.id, site.clone());
        Ok(())
    }

    async fn update_site(&self, site: &Site) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        let existing = state
            .sites
            .get_mut(&site.id)
            .ok_or_else(|| AppError::not_found("Site", site.id))?;
        *existing = Site {
            created_at: existing.created_at,
            ..site.clone()
        };
        Ok(())
    }

    async fn get_site(&self, id: Uuid) -> AppResult<Option<Site>> {
        Ok(self.inner.state.read().await.sites.get(&id).cloned())
    }

    async fn list_sites(&self) -> AppResult<Vec<Site>> {
        let state = self.inner.state.read().await;
        let mut sites: Vec<Site> = state.sites.values().cloned().collect();
        sites.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sites)
    }

    async fn insert_supplier(&self, supplier: &Supplier) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn update_supplier(&self, supplier: &Supplier) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        let existing = state
            .suppliers
            .get_mut(&supplier.id)
            .ok_or_else(|| AppError::not_found("Supplier", supplier.id))?;
        *existing = Supplier {
            created_at: existing.created_at,
            ..supplier.clone()
        };
        Ok(())
    }

    async fn get_supplier(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        Ok(self.inner.state.read().await.suppliers.get(&id).cloned())
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let state = self.inner.state.read().await;
        let mut suppliers: Vec<Supplier> = state.suppliers.values().cloned().collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn delete_supplier(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.inner.state.write().await;
        if state.suppliers.remove(&id).is_none() {
            return Ok(false);
        }
        for product in state.products.values_mut() {
            if product.supplier_id == Some(id) {
                product.supplier_id = None;
            }
        }
        Ok(true)
    }

    async fn stock_for_product(&self, product_id: Uuid) -> AppResult<Vec<SiteStock>> {
        let state = self.inner.state.read().await;
        Ok(state
            .stock
            .iter()
            .filter(|(key, _)| key.product_id == product_id)
            .map(|(key, quantity)| SiteStock {
                product_id: key.product_id,
                site_id: key.site_id,
                quantity: *quantity,
            })
            .collect())
    }

    async fn stock_for_site(&self, site_id: Uuid) -> AppResult<Vec<SiteStock>> {
        let state = self.inner.state.read().await;
        Ok(state
            .stock
            .iter()
            .filter(|(key, _)| key.site_id == site_id)
            .map(|(key, quantity)| SiteStock {
                product_id: key.product_id,
                site_id: key.site_id,
                quantity: *quantity,
            })
            .collect())
    }

    async fn stock_at(&self, key: StockKey) -> AppResult<Option<SiteStock>> {
        let state = self.inner.state.read().await;
        Ok(state.stock.get(&key).map(|quantity| SiteStock {
            product_id: key.product_id,
            site_id: key.site_id,
            quantity: *quantity,
        }))
    }

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>> {
        let state = self.inner.state.read().await;
        Ok(state.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let state = self.inner.state.read().await;
        let mut movements: Vec<Movement> = state
            .movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by(|a, b| {
            b.movement_date
                .cmp(&a.movement_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        if let Some(limit) = filter.limit {
            movements.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(movements)
    }

    async fn begin_movement(
        &self,
        product_id: Uuid,
        sites: &[Uuid],
    ) -> AppResult<Box<dyn MovementTransaction>> {
        let mut row_guards = Vec::with_capacity(sites.len());
        for site_id in sites {
            row_guards.push(self.lock_row(StockKey::new(product_id, *site_id)).await);
        }

        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            product_id,
            locked_sites: sites.to_vec(),
            _row_guards: row_guards,
            aggregate_guard: None,
            staged_stock: BTreeMap::new(),
            staged_global: None,
            staged_movement: None,
        }))
    }

    async fn insert_shopping_list(&self, list: &ShoppingList) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        if state.shopping_lists.values().any(|l| l.code == list.code) {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        state.shopping_lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn get_shopping_list(&self, id: Uuid) -> AppResult<Option<ShoppingList>> {
        Ok(self.inner.state.read().await.shopping_lists.get(&id).cloned())
    }

    async fn list_shopping_lists(&self) -> AppResult<Vec<ShoppingList>> {
        let state = self.inner.state.read().await;
        let mut lists: Vec<ShoppingList> = state.shopping_lists.values().cloned().collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lists)
    }

    async fn set_item_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> AppResult<bool> {
        let mut state = self.inner.state.write().await;
        let item = state
            .shopping_lists
            .get_mut(&list_id)
            .and_then(|list| list.items.iter_mut().find(|item| item.id == item_id));

        Ok(match item {
            Some(item) => {
                item.purchased = purchased;
                true
            }
            None => false,
        })
    }

    async fn set_shopping_list_status(
        &self,
        list_id: Uuid,
        status: ShoppingListStatus,
    ) -> AppResult<bool> {
        let mut state = self.inner.state.write().await;
        Ok(match state.shopping_lists.get_mut(&list_id) {
            Some(list) => {
                list.status = status;
                true
            }
            None => false,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Staged changes for one movement; applied to the shared state on commit.
struct MemoryTransaction {
    inner: Arc<MemoryInner>,
    product_id: Uuid,
    locked_sites: Vec<Uuid>,
    _row_guards: Vec<OwnedMutexGuard<()>>,
    aggregate_guard: Option<OwnedMutexGuard<()>>,
    staged_stock: BTreeMap<Uuid, i32>,
    staged_global: Option<i64>,
    staged_movement: Option<Movement>,
}

impl MemoryTransaction {
    fn ensure_locked(&self, site_id: Uuid) -> AppResult<()> {
        if self.locked_sites.contains(&site_id) {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "site {} was not locked for this movement",
                site_id
            )))
        }
    }

    async fn current(&self, site_id: Uuid) -> Option<i32> {
        if let Some(quantity) = self.staged_stock.get(&site_id) {
            return Some(*quantity);
        }
        let state = self.inner.state.read().await;
        state
            .stock
            .get(&StockKey::new(self.product_id, site_id))
            .copied()
    }
}

#[async_trait]
impl MovementTransaction for MemoryTransaction {
    async fn site_stock_for_update(&mut self, site_id: Uuid) -> AppResult<Option<i32>> {
        self.ensure_locked(site_id)?;
        Ok(self.current(site_id).await)
    }

    async fn debit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32> {
        self.ensure_locked(site_id)?;
        let available = self.current(site_id).await.ok_or_else(|| AppError::NoStockOnRecord {
            site: site_id.to_string(),
        })?;
        if available < quantity {
            return Err(AppError::InsufficientStock {
                site: site_id.to_string(),
                available,
                requested: quantity,
            });
        }
        let remaining = available - quantity;
        self.staged_stock.insert(site_id, remaining);
        Ok(remaining)
    }

    async fn credit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32> {
        self.ensure_locked(site_id)?;
        let total = self
            .current(site_id)
            .await
            .unwrap_or(0)
            .checked_add(quantity)
            .ok_or_else(|| AppError::Validation {
                field: "quantity".to_string(),
                message: "Site stock would exceed the maximum storable quantity".to_string(),
            })?;
        self.staged_stock.insert(site_id, total);
        Ok(total)
    }

    async fn recompute_global_stock(&mut self) -> AppResult<i64> {
        if self.aggregate_guard.is_none() {
            let lock = self
                .inner
                .aggregate_locks
                .entry(self.product_id)
                .or_default()
                .clone();
            self.aggregate_guard = Some(lock.lock_owned().await);
        }

        let state = self.inner.state.read().await;
        if !state.products.contains_key(&self.product_id) {
            return Err(AppError::not_found("Product", self.product_id));
        }

        let committed: i64 = state
            .stock
            .iter()
            .filter(|(key, _)| {
                key.product_id == self.product_id && !self.staged_stock.contains_key(&key.site_id)
            })
            .map(|(_, quantity)| i64::from(*quantity))
            .sum();
        let staged: i64 = self.staged_stock.values().map(|q| i64::from(*q)).sum();

        let total = committed + staged;
        self.staged_global = Some(total);
        Ok(total)
    }

    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()> {
        let state = self.inner.state.read().await;
        if state.reference_taken(&movement.reference) {
            return Err(AppError::DuplicateReference(movement.reference.clone()));
        }
        drop(state);
        self.staged_movement = Some(movement.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::StorageError(
                "transaction aborted before commit".to_string(),
            ));
        }

        let mut state = self.inner.state.write().await;

        if let Some(movement) = &self.staged_movement {
            if state.reference_taken(&movement.reference) {
                return Err(AppError::DuplicateReference(movement.reference.clone()));
            }
        }

        for (site_id, quantity) in &self.staged_stock {
            state
                .stock
                .insert(StockKey::new(self.product_id, *site_id), *quantity);
        }
        if let Some(global_stock) = self.staged_global {
            if let Some(product) = state.products.get_mut(&self.product_id) {
                product.global_stock = global_stock;
            }
        }
        if let Some(movement) = self.staged_movement.clone() {
            state.movements.push(movement);
        }

        Ok(())
    }
}

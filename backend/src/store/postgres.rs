//! PostgreSQL store.
//!
//! A movement runs inside one database transaction. Existing stock rows for
//! the touched sites are locked with `FOR UPDATE` in site order, first-touch
//! rows are created with `INSERT .. ON CONFLICT` so concurrent creators wait
//! on the unique index, and the product row is locked before re-aggregation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    Movement, Product, ShoppingList, ShoppingListItem, ShoppingListStatus, Site, SiteStock,
    StockKey, Supplier,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{InventoryStore, MovementFilter, MovementTransaction};
use crate::error::{map_unique_violation, AppError, AppResult};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PostgresStore {
    db: PgPool,
}

impl PostgresStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load_items(&self, list_ids: &[Uuid]) -> AppResult<Vec<ShoppingListItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, list_id, product_id, product_name, suggested_quantity, purchased
            FROM shopping_list_items
            WHERE list_id = ANY($1)
            ORDER BY product_name
            "#,
        )
        .bind(list_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ShoppingListItem::from).collect())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    code: String,
    name: String,
    category: String,
    cost_price: Decimal,
    sale_price: Decimal,
    supplier_id: Option<Uuid>,
    min_stock: i32,
    global_stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            code: row.code,
            name: row.name,
            category: row.category.parse().map_err(AppError::Internal)?,
            cost_price: row.cost_price,
            sale_price: row.sale_price,
            supplier_id: row.supplier_id,
            min_stock: row.min_stock,
            global_stock: row.global_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SiteRow {
    id: Uuid,
    name: String,
    address: String,
    site_type: String,
    manager: String,
    created_at: DateTime<Utc>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site {
            id: row.id,
            name: row.name,
            address: row.address,
            site_type: row.site_type,
            manager: row.manager,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact: String,
    phone: String,
    email: String,
    address: String,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            contact: row.contact,
            phone: row.phone,
            email: row.email,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    product_id: Uuid,
    site_id: Uuid,
    quantity: i32,
}

impl From<StockRow> for SiteStock {
    fn from(row: StockRow) -> Self {
        SiteStock {
            product_id: row.product_id,
            site_id: row.site_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    quantity: i32,
    movement_date: NaiveDate,
    origin_site_id: Option<Uuid>,
    destination_site_id: Option<Uuid>,
    reason: Option<String>,
    actor_id: Option<Uuid>,
    reference: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(Movement {
            id: row.id,
            product_id: row.product_id,
            kind: row.kind.parse().map_err(AppError::Internal)?,
            quantity: row.quantity,
            movement_date: row.movement_date,
            origin_site_id: row.origin_site_id,
            destination_site_id: row.destination_site_id,
            reason: row.reason,
            actor_id: row.actor_id,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListRow {
    id: Uuid,
    code: String,
    status: String,
    owner_id: Option<Uuid>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    list_id: Uuid,
    product_id: Uuid,
    product_name: String,
    suggested_quantity: i32,
    purchased: bool,
}

impl From<ItemRow> for ShoppingListItem {
    fn from(row: ItemRow) -> Self {
        ShoppingListItem {
            id: row.id,
            list_id: row.list_id,
            product_id: row.product_id,
            product_name: row.product_name,
            suggested_quantity: row.suggested_quantity,
            purchased: row.purchased,
        }
    }
}

fn assemble_list(row: ListRow, items: &[ShoppingListItem]) -> AppResult<ShoppingList> {
    Ok(ShoppingList {
        id: row.id,
        code: row.code,
        status: row.status.parse().map_err(AppError::Internal)?,
        owner_id: row.owner_id,
        note: row.note,
        items: items
            .iter()
            .filter(|item| item.list_id == row.id)
            .cloned()
            .collect(),
        created_at: row.created_at,
    })
}

const PRODUCT_COLUMNS: &str = "id, code, name, category, cost_price, sale_price, supplier_id, \
                               min_stock, global_stock, created_at, updated_at";

const SUPPLIER_COLUMNS: &str = "id, name, contact, phone, email, address, created_at";

const MOVEMENT_COLUMNS: &str = "id, product_id, kind, quantity, movement_date, origin_site_id, \
                                destination_site_id, reason, actor_id, reference, created_at";

// ============================================================================
// Store
// ============================================================================

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn insert_product(&self, product: &Product) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, code, name, category, cost_price, sale_price, supplier_id,
                                  min_stock, global_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10)
            "#,
        )
        .bind(product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.cost_price)
        .bind(product.sale_price)
        .bind(product.supplier_id)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::DuplicateEntry("code".to_string())))?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET code = $2, name = $3, category = $4, cost_price = $5, sale_price = $6,
                supplier_id = $7, min_stock = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.cost_price)
        .bind(product.sale_price)
        .bind(product.supplier_id)
        .bind(product.min_stock)
        .bind(product.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::DuplicateEntry("code".to_string())))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Product", product.id));
        }

        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY name, code",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    async fn insert_site(&self, site: &Site) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sites (id, name, address, site_type, manager, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(site.id)
        .bind(&site.name)
        .bind(&site.address)
        .bind(&site.site_type)
        .bind(&site.manager)
        .bind(site.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_site(&self, site: &Site) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE sites SET name = $2, address = $3, site_type = $4, manager = $5 WHERE id = $1",
        )
        .bind(site.id)
        .bind(&site.name)
        .bind(&site.address)
        .bind(&site.site_type)
        .bind(&site.manager)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Site", site.id));
        }

        Ok(())
    }

    async fn get_site(&self, id: Uuid) -> AppResult<Option<Site>> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT id, name, address, site_type, manager, created_at FROM sites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Site::from))
    }

    async fn list_sites(&self) -> AppResult<Vec<Site>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT id, name, address, site_type, manager, created_at FROM sites ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Site::from).collect())
    }

    async fn insert_supplier(&self, supplier: &Supplier) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact, phone, email, address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_supplier(&self, supplier: &Supplier) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $2, contact = $3, phone = $4, email = $5, address = $6
            WHERE id = $1
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Supplier", supplier.id));
        }

        Ok(())
    }

    async fn get_supplier(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Supplier::from))
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers ORDER BY name",
            SUPPLIER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    // products.supplier_id is cleared by ON DELETE SET NULL
    async fn delete_supplier(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stock_for_product(&self, product_id: Uuid) -> AppResult<Vec<SiteStock>> {
        let rows = sqlx::query_as::<_, StockRow>(
            "SELECT product_id, site_id, quantity FROM site_stock WHERE product_id = $1 ORDER BY site_id",
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SiteStock::from).collect())
    }

    async fn stock_for_site(&self, site_id: Uuid) -> AppResult<Vec<SiteStock>> {
        let rows = sqlx::query_as::<_, StockRow>(
            "SELECT product_id, site_id, quantity FROM site_stock WHERE site_id = $1 ORDER BY product_id",
        )
        .bind(site_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SiteStock::from).collect())
    }

    async fn stock_at(&self, key: StockKey) -> AppResult<Option<SiteStock>> {
        let row = sqlx::query_as::<_, StockRow>(
            "SELECT product_id, site_id, quantity FROM site_stock WHERE product_id = $1 AND site_id = $2",
        )
        .bind(key.product_id)
        .bind(key.site_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(SiteStock::from))
    }

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>> {
        sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM movements WHERE id = $1",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Movement::try_from)
        .transpose()
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM movements WHERE TRUE",
            MOVEMENT_COLUMNS
        ));

        if let Some(from) = filter.from {
            query.push(" AND movement_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND movement_date <= ").push_bind(to);
        }
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(site_id) = filter.site_id {
            query
                .push(" AND (origin_site_id = ")
                .push_bind(site_id)
                .push(" OR destination_site_id = ")
                .push_bind(site_id)
                .push(")");
        }
        query.push(" ORDER BY movement_date DESC, created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit.max(0));
        }

        query
            .build_query_as::<MovementRow>()
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Movement::try_from)
            .collect()
    }

    async fn begin_movement(
        &self,
        product_id: Uuid,
        sites: &[Uuid],
    ) -> AppResult<Box<dyn MovementTransaction>> {
        let mut tx = self.db.begin().await?;

        // Lock whichever rows already exist, in site order
        sqlx::query(
            r#"
            SELECT site_id FROM site_stock
            WHERE product_id = $1 AND site_id = ANY($2)
            ORDER BY site_id
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(sites)
        .fetch_all(&mut *tx)
        .await?;

        Ok(Box::new(PostgresMovementTransaction { tx, product_id }))
    }

    async fn insert_shopping_list(&self, list: &ShoppingList) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO shopping_lists (id, code, status, owner_id, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(list.id)
        .bind(&list.code)
        .bind(list.status.as_str())
        .bind(list.owner_id)
        .bind(&list.note)
        .bind(list.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::DuplicateEntry("code".to_string())))?;

        for item in &list.items {
            sqlx::query(
                r#"
                INSERT INTO shopping_list_items (id, list_id, product_id, product_name,
                                                 suggested_quantity, purchased)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id)
            .bind(list.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.suggested_quantity)
            .bind(item.purchased)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_shopping_list(&self, id: Uuid) -> AppResult<Option<ShoppingList>> {
        let row = sqlx::query_as::<_, ListRow>(
            "SELECT id, code, status, owner_id, note, created_at FROM shopping_lists WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(&[row.id]).await?;
                assemble_list(row, &items).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_shopping_lists(&self) -> AppResult<Vec<ShoppingList>> {
        let rows = sqlx::query_as::<_, ListRow>(
            "SELECT id, code, status, owner_id, note, created_at FROM shopping_lists ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let items = self.load_items(&ids).await?;

        rows.into_iter()
            .map(|row| assemble_list(row, &items))
            .collect()
    }

    async fn set_item_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE shopping_list_items SET purchased = $3 WHERE id = $2 AND list_id = $1",
        )
        .bind(list_id)
        .bind(item_id)
        .bind(purchased)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_shopping_list_status(
        &self,
        list_id: Uuid,
        status: ShoppingListStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE shopping_lists SET status = $2 WHERE id = $1")
            .bind(list_id)
            .bind(status.as_str())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

// ============================================================================
// Movement transaction
// ============================================================================

struct PostgresMovementTransaction {
    tx: Transaction<'static, Postgres>,
    product_id: Uuid,
}

#[async_trait]
impl MovementTransaction for PostgresMovementTransaction {
    async fn site_stock_for_update(&mut self, site_id: Uuid) -> AppResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM site_stock WHERE product_id = $1 AND site_id = $2 FOR UPDATE",
        )
        .bind(self.product_id)
        .bind(site_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(quantity)
    }

    async fn debit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32> {
        let remaining = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE site_stock SET quantity = quantity - $3
            WHERE product_id = $1 AND site_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(self.product_id)
        .bind(site_id)
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await?;

        remaining.ok_or_else(|| AppError::NoStockOnRecord {
            site: site_id.to_string(),
        })
    }

    async fn credit(&mut self, site_id: Uuid, quantity: i32) -> AppResult<i32> {
        let total = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO site_stock (product_id, site_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, site_id)
            DO UPDATE SET quantity = site_stock.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(self.product_id)
        .bind(site_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn recompute_global_stock(&mut self) -> AppResult<i64> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(self.product_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::not_found("Product", self.product_id))?;

        // Separate statement so the sum sees rows committed while we waited
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM site_stock WHERE product_id = $1",
        )
        .bind(self.product_id)
        .fetch_one(&mut *self.tx)
        .await?;

        sqlx::query("UPDATE products SET global_stock = $2 WHERE id = $1")
            .bind(self.product_id)
            .bind(total)
            .execute(&mut *self.tx)
            .await?;

        Ok(total)
    }

    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO movements (id, product_id, kind, quantity, movement_date, origin_site_id,
                                   destination_site_id, reason, actor_id, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(movement.id)
        .bind(movement.product_id)
        .bind(movement.kind.as_str())
        .bind(movement.quantity)
        .bind(movement.movement_date)
        .bind(movement.origin_site_id)
        .bind(movement.destination_site_id)
        .bind(&movement.reason)
        .bind(movement.actor_id)
        .bind(&movement.reference)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || AppError::DuplicateReference(movement.reference.clone()))
        })?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

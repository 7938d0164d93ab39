//! Read accessors for site stock and the product aggregate, plus the
//! dashboard and financial reports built on them

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{MovementKind, Product, ProductCategory, Site, SiteStock, StockHealth, StockKey};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, MovementFilter};

/// Stock query service
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn InventoryStore>,
}

/// Quantity of a product at one site
#[derive(Debug, Clone, Serialize)]
pub struct SiteQuantity {
    pub site_id: Uuid,
    pub site_name: String,
    pub quantity: i32,
}

/// A product's aggregate with the per-site breakdown
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockOverview {
    pub product: Product,
    pub global_stock: i64,
    pub health: StockHealth,
    pub inventory_value: Decimal,
    pub sites: Vec<SiteQuantity>,
}

/// Product at or under its reorder threshold
#[derive(Debug, Clone, Serialize)]
pub struct LowStockProduct {
    pub product_id: Uuid,
    pub code: String,
    pub name: String,
    pub global_stock: i64,
    pub min_stock: i32,
    pub health: StockHealth,
    pub suggested_quantity: i32,
}

/// One line of a site inventory report
#[derive(Debug, Clone, Serialize)]
pub struct SiteInventoryLine {
    pub product_id: Uuid,
    pub code: String,
    pub name: String,
    pub quantity: i32,
    pub sale_price: Decimal,
    pub value: Decimal,
}

/// Everything currently held at a site
#[derive(Debug, Clone, Serialize)]
pub struct SiteInventory {
    pub site_id: Uuid,
    pub site_name: String,
    pub is_warehouse: bool,
    pub lines: Vec<SiteInventoryLine>,
    pub total_units: i64,
    pub total_value: Decimal,
}

/// Number of products in one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: ProductCategory,
    pub products: usize,
}

/// Stock held at one site, valued at sale price
#[derive(Debug, Clone, Serialize)]
pub struct SiteValue {
    pub site_id: Uuid,
    pub name: String,
    pub site_type: String,
    /// Stock rows at the site, emptied ones included
    pub total_items: usize,
    pub value: Decimal,
}

/// Headline figures for the whole inventory
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_products: usize,
    pub inventory_value: Decimal,
    pub low_stock_count: usize,
    pub movements_today: usize,
    /// Most populated category first
    pub categories: Vec<CategoryCount>,
    /// Sites holding rows, most valuable first
    pub sites: Vec<SiteValue>,
}

/// Optional inclusive date bounds for a report
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    fn filter(&self) -> AppResult<MovementFilter> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::Validation {
                    field: "from".to_string(),
                    message: "Start date must not be after end date".to_string(),
                });
            }
        }
        Ok(MovementFilter {
            from: self.from,
            to: self.to,
            ..Default::default()
        })
    }
}

/// Outgoing stock sharing one reference
#[derive(Debug, Clone, Serialize)]
pub struct OutflowSummary {
    pub reference: String,
    pub movement_date: NaiveDate,
    pub actor_id: Option<Uuid>,
    pub origin_site_id: Option<Uuid>,
    pub origin_name: Option<String>,
    pub destination_site_id: Option<Uuid>,
    pub destination_name: Option<String>,
    pub total_items: i64,
    pub value: Decimal,
}

/// Value of the stock delivered to a non-warehouse site
#[derive(Debug, Clone, Serialize)]
pub struct UnitCost {
    pub site_id: Uuid,
    pub name: String,
    pub site_type: String,
    pub total_cost: Decimal,
}

impl StockService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Stock rows of a product across all sites
    pub async fn stock_for_product(&self, product_id: Uuid) -> AppResult<Vec<SiteStock>> {
        self.store.stock_for_product(product_id).await
    }

    /// Stock rows held at a site
    pub async fn stock_for_site(&self, site_id: Uuid) -> AppResult<Vec<SiteStock>> {
        self.store.stock_for_site(site_id).await
    }

    /// Quantity at one (product, site) pair; 0 when no row exists yet
    pub async fn quantity_at(&self, product_id: Uuid, site_id: Uuid) -> AppResult<i32> {
        Ok(self
            .store
            .stock_at(StockKey::new(product_id, site_id))
            .await?
            .map_or(0, |row| row.quantity))
    }

    /// Cached global stock of a product
    pub async fn global_stock(&self, product_id: Uuid) -> AppResult<i64> {
        Ok(self.product(product_id).await?.global_stock)
    }

    pub async fn product_overview(&self, product_id: Uuid) -> AppResult<ProductStockOverview> {
        let product = self.product(product_id).await?;
        let site_names = self.site_names().await?;

        let sites = self
            .store
            .stock_for_product(product_id)
            .await?
            .into_iter()
            .map(|row| SiteQuantity {
                site_name: site_names
                    .get(&row.site_id)
                    .cloned()
                    .unwrap_or_default(),
                site_id: row.site_id,
                quantity: row.quantity,
            })
            .collect();

        Ok(ProductStockOverview {
            global_stock: product.global_stock,
            health: product.health(),
            inventory_value: product.inventory_value(),
            product,
            sites,
        })
    }

    /// Products whose global stock is at or under their threshold, most urgent first
    pub async fn low_stock_products(&self) -> AppResult<Vec<LowStockProduct>> {
        let mut low: Vec<LowStockProduct> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(Product::needs_restock)
            .map(|product| LowStockProduct {
                health: product.health(),
                suggested_quantity: shared::suggested_quantity(
                    product.min_stock,
                    product.global_stock,
                ),
                product_id: product.id,
                code: product.code,
                name: product.name,
                global_stock: product.global_stock,
                min_stock: product.min_stock,
            })
            .collect();

        low.sort_by(|a, b| {
            a.global_stock
                .cmp(&b.global_stock)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(low)
    }

    /// Non-empty stock rows at a site valued at sale price
    pub async fn site_inventory(&self, site_id: Uuid) -> AppResult<SiteInventory> {
        let site = self
            .store
            .get_site(site_id)
            .await?
            .ok_or_else(|| AppError::not_found("Site", site_id))?;

        let products: HashMap<Uuid, Product> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut lines: Vec<SiteInventoryLine> = self
            .store
            .stock_for_site(site_id)
            .await?
            .into_iter()
            .filter(|row| row.quantity > 0)
            .filter_map(|row| {
                let product = products.get(&row.product_id)?;
                Some(SiteInventoryLine {
                    product_id: product.id,
                    code: product.code.clone(),
                    name: product.name.clone(),
                    quantity: row.quantity,
                    sale_price: product.sale_price,
                    value: product.sale_price * Decimal::from(row.quantity),
                })
            })
            .collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name));

        let total_units = lines.iter().map(|line| i64::from(line.quantity)).sum();
        let total_value = lines.iter().map(|line| line.value).sum();

        Ok(SiteInventory {
            is_warehouse: site.is_warehouse(),
            site_id: site.id,
            site_name: site.name,
            lines,
            total_units,
            total_value,
        })
    }

    /// Inventory value, alerts, today's activity and per-site valuation
    pub async fn dashboard_summary(&self) -> AppResult<DashboardSummary> {
        let products = self.store.list_products().await?;
        let today = Utc::now().date_naive();
        let movements_today = self
            .store
            .list_movements(&MovementFilter {
                from: Some(today),
                to: Some(today),
                ..Default::default()
            })
            .await?
            .len();

        let mut by_category: HashMap<ProductCategory, usize> = HashMap::new();
        for product in &products {
            *by_category.entry(product.category).or_default() += 1;
        }
        let mut categories: Vec<CategoryCount> = by_category
            .into_iter()
            .map(|(category, products)| CategoryCount { category, products })
            .collect();
        categories.sort_by(|a, b| {
            b.products
                .cmp(&a.products)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });

        let prices = sale_prices(&products);
        let mut sites = Vec::new();
        for site in self.store.list_sites().await? {
            let value = self.site_value(&site, &prices).await?;
            if value.total_items > 0 || value.value > Decimal::ZERO {
                sites.push(value);
            }
        }
        sort_by_value(&mut sites);

        Ok(DashboardSummary {
            total_products: products.len(),
            inventory_value: products.iter().map(Product::inventory_value).sum(),
            low_stock_count: products.iter().filter(|p| p.needs_restock()).count(),
            movements_today,
            categories,
            sites,
        })
    }

    /// Current valuation of every warehouse, most valuable first
    pub async fn warehouse_values(&self) -> AppResult<Vec<SiteValue>> {
        let prices = sale_prices(&self.store.list_products().await?);
        let mut values = Vec::new();
        for site in self.store.list_sites().await? {
            if site.is_warehouse() {
                values.push(self.site_value(&site, &prices).await?);
            }
        }
        sort_by_value(&mut values);
        Ok(values)
    }

    /// OUT and REPLACEMENT movements in `range` grouped by reference,
    /// valued at sale price, newest first
    pub async fn outflows_by_reference(&self, range: ReportRange) -> AppResult<Vec<OutflowSummary>> {
        let movements = self.store.list_movements(&range.filter()?).await?;
        let prices = sale_prices(&self.store.list_products().await?);
        let site_names = self.site_names().await?;
        let name_of = |site: Option<Uuid>| site.and_then(|id| site_names.get(&id).cloned());

        let mut groups: BTreeMap<String, OutflowSummary> = BTreeMap::new();
        for movement in movements
            .iter()
            .filter(|m| matches!(m.kind, MovementKind::Out | MovementKind::Replacement))
        {
            let price = prices.get(&movement.product_id).copied().unwrap_or_default();
            let group = groups
                .entry(movement.reference.clone())
                .or_insert_with(|| OutflowSummary {
                    reference: movement.reference.clone(),
                    movement_date: movement.movement_date,
                    actor_id: movement.actor_id,
                    origin_site_id: movement.origin_site_id,
                    origin_name: name_of(movement.origin_site_id),
                    destination_site_id: movement.destination_site_id,
                    destination_name: name_of(movement.destination_site_id),
                    total_items: 0,
                    value: Decimal::ZERO,
                });
            group.total_items += i64::from(movement.quantity);
            group.value += price * Decimal::from(movement.quantity);
        }

        let mut outflows: Vec<OutflowSummary> = groups.into_values().collect();
        outflows.sort_by(|a, b| {
            b.movement_date
                .cmp(&a.movement_date)
                .then_with(|| a.reference.cmp(&b.reference))
        });
        Ok(outflows)
    }

    /// Sale-price value of OUT and TRANSFER movements delivered to each
    /// non-warehouse site in `range`. Sites with no cost are left out.
    pub async fn unit_costs(&self, range: ReportRange) -> AppResult<Vec<UnitCost>> {
        let movements = self.store.list_movements(&range.filter()?).await?;
        let prices = sale_prices(&self.store.list_products().await?);

        let mut costs: HashMap<Uuid, Decimal> = HashMap::new();
        for movement in movements
            .iter()
            .filter(|m| matches!(m.kind, MovementKind::Out | MovementKind::Transfer))
        {
            if let Some(destination) = movement.destination_site_id {
                let price = prices.get(&movement.product_id).copied().unwrap_or_default();
                *costs.entry(destination).or_default() += price * Decimal::from(movement.quantity);
            }
        }

        Ok(self
            .store
            .list_sites()
            .await?
            .into_iter()
            .filter(|site| !site.is_warehouse())
            .filter_map(|site| {
                let total_cost = costs.get(&site.id).copied().unwrap_or_default();
                (total_cost > Decimal::ZERO).then(|| UnitCost {
                    site_id: site.id,
                    name: site.name,
                    site_type: site.site_type,
                    total_cost,
                })
            })
            .collect())
    }

    async fn site_value(&self, site: &Site, prices: &HashMap<Uuid, Decimal>) -> AppResult<SiteValue> {
        let rows = self.store.stock_for_site(site.id).await?;
        let value = rows
            .iter()
            .map(|row| {
                prices.get(&row.product_id).copied().unwrap_or_default() * Decimal::from(row.quantity)
            })
            .sum();

        Ok(SiteValue {
            site_id: site.id,
            name: site.name.clone(),
            site_type: site.site_type.clone(),
            total_items: rows.len(),
            value,
        })
    }

    async fn product(&self, product_id: Uuid) -> AppResult<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))
    }

    async fn site_names(&self) -> AppResult<HashMap<Uuid, String>> {
        Ok(self
            .store
            .list_sites()
            .await?
            .into_iter()
            .map(|site| (site.id, site.name))
            .collect())
    }
}

fn sale_prices(products: &[Product]) -> HashMap<Uuid, Decimal> {
    products
        .iter()
        .map(|product| (product.id, product.sale_price))
        .collect()
}

fn sort_by_value(values: &mut [SiteValue]) {
    values.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
}

//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{Product, ProductCategory, Site};
use uuid::Uuid;

use inventory_server::config::{
    Config, DatabaseConfig, LedgerConfig, ServerConfig, StorageBackend, StorageConfig,
};
use inventory_server::services::catalog::{CreateProductInput, CreateSiteInput};
use inventory_server::services::ledger::{MovementReceipt, RecordMovementInput};
use inventory_server::services::{CatalogService, LedgerService, ShoppingListService, StockService};
use inventory_server::{AppResult, InventoryStore, MemoryStore};

pub struct Fixture {
    pub store: MemoryStore,
    pub ledger: LedgerService,
    pub catalog: CatalogService,
    pub stock: StockService,
    pub lists: ShoppingListService,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn InventoryStore> = Arc::new(store.clone());
        Self {
            ledger: LedgerService::new(shared.clone(), LedgerConfig::default().reference_attempts),
            catalog: CatalogService::new(shared.clone()),
            stock: StockService::new(shared.clone()),
            lists: ShoppingListService::new(shared),
            store,
        }
    }

    pub async fn product(&self, code: &str, min_stock: i32) -> Product {
        self.catalog
            .create_product(CreateProductInput {
                code: code.to_string(),
                name: format!("Product {}", code),
                category: ProductCategory::Maintenance,
                cost_price: Decimal::new(500, 2),
                sale_price: Decimal::new(1000, 2),
                supplier_id: None,
                min_stock,
            })
            .await
            .unwrap()
    }

    pub async fn site(&self, name: &str) -> Site {
        self.catalog
            .create_site(CreateSiteInput {
                name: name.to_string(),
                address: format!("{} street 1", name),
                site_type: "Warehouse".to_string(),
                manager: "Facilities".to_string(),
            })
            .await
            .unwrap()
    }

    /// End-use site, not a warehouse
    pub async fn unit(&self, name: &str) -> Site {
        self.catalog
            .create_site(CreateSiteInput {
                name: name.to_string(),
                address: String::new(),
                site_type: "Apartment".to_string(),
                manager: String::new(),
            })
            .await
            .unwrap()
    }

    pub async fn record(&self, input: RecordMovementInput) -> AppResult<MovementReceipt> {
        self.ledger.record_movement(input, None).await
    }

    pub async fn receive(&self, product: &Product, site: &Site, quantity: i32) -> MovementReceipt {
        self.record(
            RecordMovementInput::new(product.id, shared::MovementKind::In, quantity).to_site(site.id),
        )
        .await
        .unwrap()
    }

    pub async fn quantity(&self, product: &Product, site: &Site) -> i32 {
        self.stock.quantity_at(product.id, site.id).await.unwrap()
    }

    pub async fn global_stock(&self, product: &Product) -> i64 {
        self.stock.global_stock(product.id).await.unwrap()
    }

    /// Sum of the product's stock rows, read independently of the aggregate
    pub async fn row_sum(&self, product_id: Uuid) -> i64 {
        self.stock
            .stock_for_product(product_id)
            .await
            .unwrap()
            .iter()
            .map(|row| i64::from(row.quantity))
            .sum()
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/site_inventory_test".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 1,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        ledger: LedgerConfig::default(),
    }
}

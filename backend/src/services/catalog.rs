//! Product, site and supplier catalog service
//!
//! Descriptive fields only. Stock figures are owned by the ledger.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_email, validate_min_stock, validate_price, validate_product_code, Product,
    ProductCategory, Site, Supplier,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

/// Catalog service for products, sites and suppliers
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 50, message = "Product code must be 1 to 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Product name must be 1 to 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub category: ProductCategory,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub min_stock: i32,
}

/// Input for updating a product. Global stock is not editable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 50, message = "Product code must be 1 to 50 characters"))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Product name must be 1 to 200 characters"))]
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    /// Remove the product's supplier; wins over `supplier_id`
    #[serde(default)]
    pub clear_supplier: bool,
    pub min_stock: Option<i32>,
}

/// Input for creating a site
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSiteInput {
    #[validate(length(min = 1, max = 200, message = "Site name must be 1 to 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub site_type: String,
    #[serde(default)]
    pub manager: String,
}

/// Input for updating a site
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSiteInput {
    #[validate(length(min = 1, max = 200, message = "Site name must be 1 to 200 characters"))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub site_type: Option<String>,
    pub manager: Option<String>,
}

/// Input for creating a supplier
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 100, message = "Supplier name must be 1 to 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Contact must be at most 100 characters"))]
    pub contact: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

/// Input for updating a supplier
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 100, message = "Supplier name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "Contact must be at most 100 characters"))]
    pub contact: Option<String>,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn check(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    })
}

fn check_product_fields(
    code: &str,
    cost_price: Decimal,
    sale_price: Decimal,
    min_stock: i32,
) -> AppResult<()> {
    check("code", validate_product_code(code))?;
    check("cost_price", validate_price(cost_price))?;
    check("sale_price", validate_price(sale_price))?;
    check("min_stock", validate_min_stock(min_stock))
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Create a product with zero stock
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        let code = input.code.trim().to_string();
        check_product_fields(&code, input.cost_price, input.sale_price, input.min_stock)?;
        if let Some(supplier_id) = input.supplier_id {
            self.get_supplier(supplier_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            code,
            name: input.name.trim().to_string(),
            category: input.category,
            cost_price: input.cost_price,
            sale_price: input.sale_price,
            supplier_id: input.supplier_id,
            min_stock: input.min_stock,
            global_stock: 0,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, code = %product.code, "Product created");

        Ok(product)
    }

    /// Update descriptive fields of a product
    pub async fn update_product(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        let mut product = self.get_product(id).await?;

        if let Some(code) = input.code {
            product.code = code.trim().to_string();
        }
        if let Some(name) = input.name {
            product.name = name.trim().to_string();
        }
        if let Some(category) = input.category {
            product.category = category;
        }
        if let Some(cost_price) = input.cost_price {
            product.cost_price = cost_price;
        }
        if let Some(sale_price) = input.sale_price {
            product.sale_price = sale_price;
        }
        if input.clear_supplier {
            product.supplier_id = None;
        } else if let Some(supplier_id) = input.supplier_id {
            self.get_supplier(supplier_id).await?;
            product.supplier_id = Some(supplier_id);
        }
        if let Some(min_stock) = input.min_stock {
            product.min_stock = min_stock;
        }
        check_product_fields(
            &product.code,
            product.cost_price,
            product.sale_price,
            product.min_stock,
        )?;

        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;

        // Re-read so the returned aggregate is the stored one
        self.get_product(id).await
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", id))
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.store.list_products().await
    }

    // ========================================================================
    // Sites
    // ========================================================================

    pub async fn create_site(&self, input: CreateSiteInput) -> AppResult<Site> {
        input.validate()?;

        let site = Site {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            address: input.address,
            site_type: input.site_type,
            manager: input.manager,
            created_at: Utc::now(),
        };

        self.store.insert_site(&site).await?;
        tracing::info!(site_id = %site.id, name = %site.name, "Site created");

        Ok(site)
    }

    pub async fn update_site(&self, id: Uuid, input: UpdateSiteInput) -> AppResult<Site> {
        input.validate()?;
        let mut site = self.get_site(id).await?;

        if let Some(name) = input.name {
            site.name = name.trim().to_string();
        }
        if let Some(address) = input.address {
            site.address = address;
        }
        if let Some(site_type) = input.site_type {
            site.site_type = site_type;
        }
        if let Some(manager) = input.manager {
            site.manager = manager;
        }

        self.store.update_site(&site).await?;
        Ok(site)
    }

    pub async fn get_site(&self, id: Uuid) -> AppResult<Site> {
        self.store
            .get_site(id)
            .await?
            .ok_or_else(|| AppError::not_found("Site", id))
    }

    pub async fn list_sites(&self) -> AppResult<Vec<Site>> {
        self.store.list_sites().await
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        let email = input.email.trim().to_string();
        check("email", validate_email(&email))?;

        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            contact: input.contact.trim().to_string(),
            phone: input.phone.trim().to_string(),
            email,
            address: input.address,
            created_at: Utc::now(),
        };

        self.store.insert_supplier(&supplier).await?;
        tracing::info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");

        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        input.validate()?;
        let mut supplier = self.get_supplier(id).await?;

        if let Some(name) = input.name {
            supplier.name = name.trim().to_string();
        }
        if let Some(contact) = input.contact {
            supplier.contact = contact.trim().to_string();
        }
        if let Some(phone) = input.phone {
            supplier.phone = phone.trim().to_string();
        }
        if let Some(email) = input.email {
            supplier.email = email.trim().to_string();
        }
        if let Some(address) = input.address {
            supplier.address = address;
        }
        check("email", validate_email(&supplier.email))?;

        self.store.update_supplier(&supplier).await?;
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: Uuid) -> AppResult<Supplier> {
        self.store
            .get_supplier(id)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier", id))
    }

    /// All suppliers ordered by name
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        self.store.list_suppliers().await
    }

    /// Delete a supplier. Its products stay, without a supplier.
    pub async fn delete_supplier(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete_supplier(id).await? {
            return Err(AppError::not_found("Supplier", id));
        }
        tracing::info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}

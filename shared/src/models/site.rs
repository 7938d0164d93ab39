//! Storage sites and per-site stock

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical location holding stock (warehouse or end-use unit)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    /// Free-text tag, e.g. "Warehouse" or "Apartment"
    pub site_type: String,
    /// Person in charge
    pub manager: String,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn is_warehouse(&self) -> bool {
        let tag = self.site_type.to_lowercase();
        tag.contains("warehouse") || tag.contains("bodega")
    }
}

/// Quantity of one product held at one site.
///
/// At most one row exists per (product, site); rows are created on the first
/// movement that credits the pair and are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteStock {
    pub product_id: Uuid,
    pub site_id: Uuid,
    pub quantity: i32,
}

/// Key of a site stock row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: Uuid,
    pub site_id: Uuid,
}

impl StockKey {
    pub fn new(product_id: Uuid, site_id: Uuid) -> Self {
        Self {
            product_id,
            site_id,
        }
    }
}

//! Product catalog models and stock health

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    /// Unique product code (e.g., "KIT-0042")
    pub code: String,
    pub name: String,
    pub category: ProductCategory,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    /// Usual supplier; cleared when the supplier is removed
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    /// Reorder threshold
    pub min_stock: i32,
    /// Sum of every site stock row for this product.
    /// Written only by movement reconciliation.
    pub global_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn health(&self) -> StockHealth {
        StockHealth::classify(self.global_stock, self.min_stock)
    }

    /// Global stock valued at sale price
    pub fn inventory_value(&self) -> Decimal {
        Decimal::from(self.global_stock) * self.sale_price
    }

    /// At or below the reorder threshold
    pub fn needs_restock(&self) -> bool {
        self.global_stock <= i64::from(self.min_stock)
    }
}

/// Zone of use for a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ProductCategory {
    Kitchen,
    #[serde(rename = "Livingroom")]
    LivingRoom,
    Bedroom,
    Bathroom,
    Maintenance,
    #[default]
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Kitchen => "Kitchen",
            ProductCategory::LivingRoom => "Livingroom",
            ProductCategory::Bedroom => "Bedroom",
            ProductCategory::Bathroom => "Bathroom",
            ProductCategory::Maintenance => "Maintenance",
            ProductCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::LivingRoom => write!(f, "Living Room"),
            ProductCategory::Maintenance => write!(f, "Maintenance / Tools"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Kitchen" => Ok(ProductCategory::Kitchen),
            "Livingroom" => Ok(ProductCategory::LivingRoom),
            "Bedroom" => Ok(ProductCategory::Bedroom),
            "Bathroom" => Ok(ProductCategory::Bathroom),
            "Maintenance" => Ok(ProductCategory::Maintenance),
            "Other" => Ok(ProductCategory::Other),
            other => Err(format!("unknown product category: {}", other)),
        }
    }
}

/// Stock health derived from global stock and the reorder threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockHealth {
    /// Nothing left anywhere
    Critical,
    /// At or below the reorder threshold
    Low,
    Ok,
}

impl StockHealth {
    pub fn classify(global_stock: i64, min_stock: i32) -> Self {
        if global_stock <= 0 {
            StockHealth::Critical
        } else if global_stock <= i64::from(min_stock) {
            StockHealth::Low
        } else {
            StockHealth::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockHealth::Critical => "CRITICAL",
            StockHealth::Low => "LOW",
            StockHealth::Ok => "OK",
        }
    }
}

impl std::fmt::Display for StockHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested purchase quantity: the deficit to the threshold, never less than one
pub fn suggested_quantity(min_stock: i32, global_stock: i64) -> i32 {
    let deficit = i64::from(min_stock) - global_stock;
    if deficit > 0 {
        i32::try_from(deficit).unwrap_or(i32::MAX)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(global_stock: i64, min_stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            code: "KIT-001".to_string(),
            name: "Dish rack".to_string(),
            category: ProductCategory::Kitchen,
            cost_price: Decimal::new(1250, 2),
            sale_price: Decimal::new(2000, 2),
            supplier_id: None,
            min_stock,
            global_stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_health_boundaries() {
        assert_eq!(StockHealth::classify(0, 5), StockHealth::Critical);
        assert_eq!(StockHealth::classify(-3, 5), StockHealth::Critical);
        assert_eq!(StockHealth::classify(1, 5), StockHealth::Low);
        assert_eq!(StockHealth::classify(5, 5), StockHealth::Low);
        assert_eq!(StockHealth::classify(6, 5), StockHealth::Ok);
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(StockHealth::classify(0, 0), StockHealth::Critical);
        assert_eq!(StockHealth::classify(1, 0), StockHealth::Ok);
    }

    #[test]
    fn test_suggested_quantity() {
        assert_eq!(suggested_quantity(5, 0), 5);
        assert_eq!(suggested_quantity(5, 3), 2);
        assert_eq!(suggested_quantity(5, 5), 1);
        assert_eq!(suggested_quantity(5, 9), 1);
        assert_eq!(suggested_quantity(0, 0), 1);
    }

    #[test]
    fn test_inventory_value() {
        let p = product(4, 5);
        assert_eq!(p.inventory_value(), Decimal::new(8000, 2));
        assert_eq!(p.health(), StockHealth::Low);
        assert!(p.needs_restock());
    }

    #[test]
    fn test_category_round_trip_codes() {
        for category in [
            ProductCategory::Kitchen,
            ProductCategory::LivingRoom,
            ProductCategory::Bedroom,
            ProductCategory::Bathroom,
            ProductCategory::Maintenance,
            ProductCategory::Other,
        ] {
            assert_eq!(category.as_str().parse::<ProductCategory>(), Ok(category));
        }
        assert!("Garage".parse::<ProductCategory>().is_err());
    }
}

//! WebAssembly module for the Site Inventory Ledger
//!
//! Provides client-side computation for:
//! - Stock health classification
//! - Purchase suggestions
//! - Movement form pre-validation
//! - Reference prefixes and stock valuation
//! - Offline shopping list previews

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::validation::*;

/// Classify stock health ("CRITICAL", "LOW" or "OK") for a global stock and threshold
#[wasm_bindgen]
pub fn classify_stock_health(global_stock: i32, min_stock: i32) -> String {
    StockHealth::classify(i64::from(global_stock), min_stock).to_string()
}

/// Suggested purchase quantity for a shopping list item
#[wasm_bindgen]
pub fn suggested_purchase_quantity(min_stock: i32, global_stock: i32) -> i32 {
    suggested_quantity(min_stock, i64::from(global_stock))
}

/// Reference prefix for a movement kind code; "MOV" when the code is unknown
#[wasm_bindgen]
pub fn movement_reference_prefix(kind: &str) -> String {
    reference_prefix_for(kind).to_string()
}

/// Check a movement form before submitting it.
///
/// Returns the violation message, or an empty string when the movement is
/// acceptable. `same_site` is only meaningful when both sites are present.
#[wasm_bindgen]
pub fn validate_movement_sites(
    kind: &str,
    quantity: i32,
    has_origin: bool,
    has_destination: bool,
    same_site: bool,
) -> String {
    let kind: MovementKind = match kind.parse() {
        Ok(kind) => kind,
        Err(message) => return message,
    };

    let origin = Uuid::from_u128(1);
    let destination = if same_site { origin } else { Uuid::from_u128(2) };

    match MovementPlan::new(
        kind,
        quantity,
        has_origin.then_some(origin),
        has_destination.then_some(destination),
    ) {
        Ok(_) => String::new(),
        Err(violation) => violation.to_string(),
    }
}

/// Field a movement violation message refers to, for highlighting in forms
#[wasm_bindgen]
pub fn movement_violation_field(
    kind: &str,
    quantity: i32,
    has_origin: bool,
    has_destination: bool,
    same_site: bool,
) -> String {
    let Ok(kind) = kind.parse::<MovementKind>() else {
        return "kind".to_string();
    };

    let origin = Uuid::from_u128(1);
    let destination = if same_site { origin } else { Uuid::from_u128(2) };

    MovementPlan::new(
        kind,
        quantity,
        has_origin.then_some(origin),
        has_destination.then_some(destination),
    )
    .err()
    .map(|violation| violation.field().to_string())
    .unwrap_or_default()
}

/// Stock value at sale price
#[wasm_bindgen]
pub fn calculate_stock_value(quantity: i32, sale_price: f64) -> f64 {
    let price = Decimal::try_from(sale_price).unwrap_or(Decimal::ZERO);
    (price * Decimal::from(quantity)).to_f64().unwrap_or(0.0)
}

/// A product that would go on a shopping list
#[derive(Debug, Serialize)]
struct ShoppingSuggestion {
    product_id: Uuid,
    code: String,
    name: String,
    health: StockHealth,
    suggested_quantity: i32,
}

fn shopping_suggestions(products: &[Product]) -> Vec<ShoppingSuggestion> {
    products
        .iter()
        .filter(|product| product.needs_restock())
        .map(|product| ShoppingSuggestion {
            product_id: product.id,
            code: product.code.clone(),
            name: product.name.clone(),
            health: product.health(),
            suggested_quantity: suggested_quantity(product.min_stock, product.global_stock),
        })
        .collect()
}

/// Preview a shopping list from a JSON array of products
#[wasm_bindgen]
pub fn preview_shopping_list(products_json: &str) -> Result<String, JsValue> {
    let products: Vec<Product> = serde_json::from_str(products_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid products JSON: {}", e)))?;

    serde_json::to_string(&shopping_suggestions(&products))
        .map_err(|e| JsValue::from_str(&format!("Failed to encode suggestions: {}", e)))
}

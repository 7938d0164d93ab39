//! Validation rules for movements and catalog fields

use rust_decimal::Decimal;
use thiserror::Error;

// ============================================================================
// Movement Rules
// ============================================================================

/// A movement request that breaks a precondition of its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MovementRuleViolation {
    #[error("Quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i32),

    #[error("Missing required site: {field}")]
    MissingSite { field: &'static str },

    #[error("Origin and destination cannot be the same site")]
    SameSiteTransfer,
}

impl MovementRuleViolation {
    /// Input field the violation refers to
    pub fn field(&self) -> &'static str {
        match self {
            MovementRuleViolation::NonPositiveQuantity(_) => "quantity",
            MovementRuleViolation::MissingSite { field } => *field,
            MovementRuleViolation::SameSiteTransfer => "destination",
        }
    }
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate product code format (non-blank, no whitespace)
pub fn validate_product_code(code: &str) -> Result<(), &'static str> {
    if code.trim().is_empty() {
        return Err("Product code cannot be blank");
    }
    if code.chars().any(char::is_whitespace) {
        return Err("Product code cannot contain whitespace");
    }
    Ok(())
}

/// Largest price a `NUMERIC(10, 2)` column holds
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Validate a cost or sale price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    // Trailing zeros do not count: 19.990 is 19.99
    if price.normalize().scale() > 2 {
        return Err("Price cannot have more than two decimal places");
    }
    if price > MAX_PRICE {
        return Err("Price cannot exceed 99,999,999.99");
    }
    Ok(())
}

/// Validate a reorder threshold
pub fn validate_min_stock(min_stock: i32) -> Result<(), &'static str> {
    if min_stock < 0 {
        return Err("Reorder threshold cannot be negative");
    }
    Ok(())
}

/// Validate an optional email address (basic check); blank means none
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

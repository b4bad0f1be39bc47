//! # Validation Module
//!
//! Input validation for catalog and inventory writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI / ERP wire decoding                                      │
//! │  ├── Type validation (clap, serde)                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, required fields, normalization                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger (ledger.rs)                                           │
//! │  ├── Quantity rules (positive counts, enough stock)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                       │
//! │  ├── UNIQUE (code), UNIQUE (erp_code)                                  │
//! │  └── UNIQUE (product_id, color_code, size)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{InventoryItem, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_CODE_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes a business code (product code, color code,
/// size, warehouse). Returns the trimmed, uppercased value.
///
/// ```rust
/// use stockbridge_core::validation::normalize_code;
///
/// assert_eq!(normalize_code("code", " cam-001 ").unwrap(), "CAM-001");
/// assert!(normalize_code("code", "").is_err());
/// ```
pub fn normalize_code(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }

    Ok(value.to_uppercase())
}

/// Trims and uppercases an optional location/lot part, dropping blanks.
pub fn normalize_optional_code(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_uppercase)
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional description: at most 500 characters.
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    if let Some(text) = description {
        if text.trim().chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::TooLong {
                field: "description".to_string(),
                max: MAX_DESCRIPTION_LEN,
            });
        }
    }
    Ok(())
}

/// Lowercases, trims and de-duplicates tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock counter (physical, minimum, maximum): non-negative.
pub fn validate_stock_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a price in cents: non-negative.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a material composition percentage: 0-100.
pub fn validate_percentage(value: i64) -> ValidationResult<()> {
    if !(0..=100).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "material percentage".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates and normalizes a product before it is written.
pub fn validate_product(product: &mut Product) -> ValidationResult<()> {
    product.code = normalize_code("code", &product.code)?;
    product.erp_code = product.erp_code.trim().to_string();
    if product.erp_code.is_empty() {
        return Err(ValidationError::Required {
            field: "erp_code".to_string(),
        });
    }
    validate_product_name(&product.name)?;
    product.name = product.name.trim().to_string();
    validate_description(product.description.as_deref())?;

    validate_price_cents("cost price", product.price.cost.cents())?;
    validate_price_cents("sale price", product.price.sale.cents())?;
    if let Some(promo) = product.price.promo {
        validate_price_cents("promotional price", promo.cents())?;
    }
    for material in &product.materials {
        if let Some(pct) = material.percentage {
            validate_percentage(pct)?;
        }
    }

    if product.brand.trim().is_empty() {
        product.brand = crate::types::DEFAULT_BRAND.to_string();
    }
    product.tags = normalize_tags(&product.tags);
    Ok(())
}

/// Validates and normalizes an inventory line before it is written.
pub fn validate_item(item: &mut InventoryItem) -> ValidationResult<()> {
    if item.color.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "color name".to_string(),
        });
    }
    item.color.name = item.color.name.trim().to_string();
    item.color.code = normalize_code("color code", &item.color.code)?;
    item.size = normalize_code("size", &item.size)?;
    item.location.warehouse = normalize_code("warehouse", &item.location.warehouse)?;
    item.location.aisle = normalize_optional_code(item.location.aisle.as_deref());
    item.location.shelf = normalize_optional_code(item.location.shelf.as_deref());
    item.location.slot = normalize_optional_code(item.location.slot.as_deref());
    if let Some(lot) = item.lot.as_mut() {
        lot.number = normalize_optional_code(lot.number.as_deref());
    }

    let q = item.quantity;
    validate_stock_count("physical", q.physical)?;
    validate_stock_count("reserved", q.reserved)?;
    validate_stock_count("minimum", q.minimum)?;
    validate_stock_count("maximum", q.maximum)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

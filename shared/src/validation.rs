//! Validation utilities for catalog records entering the engine
//!
//! Stored consumable lists are loosely shaped JSON documents. They are
//! normalized here, at the adapter boundary, so the engine only ever sees
//! typed [`ExpectedConsumable`] values.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::models::{ExpectedConsumable, Product};

// ============================================================================
// Consumable Lists
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawConsumable {
    #[serde(alias = "productId")]
    product_id: Uuid,
    quantity: Decimal,
}

/// Result of normalizing a stored consumable list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedConsumables {
    pub consumables: Vec<ExpectedConsumable>,
    /// Entries dropped because they were malformed or not positive
    pub dropped: usize,
    /// Entries folded into an earlier line for the same product
    pub merged: usize,
}

/// Normalize a stored consumable list.
///
/// Malformed entries and non-positive quantities are dropped; repeated
/// products are merged into their first line by summing quantities.
pub fn normalize_expected_consumables(raw: &serde_json::Value) -> NormalizedConsumables {
    let mut result = NormalizedConsumables::default();
    let Some(entries) = raw.as_array() else {
        if !raw.is_null() {
            result.dropped = 1;
        }
        return result;
    };

    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    for entry in entries {
        let parsed = match serde_json::from_value::<RawConsumable>(entry.clone()) {
            Ok(parsed) if parsed.quantity > Decimal::ZERO => parsed,
            _ => {
                result.dropped += 1;
                continue;
            }
        };
        match positions.get(&parsed.product_id) {
            Some(&idx) => {
                result.consumables[idx].quantity += parsed.quantity;
                result.merged += 1;
            }
            None => {
                positions.insert(parsed.product_id, result.consumables.len());
                result
                    .consumables
                    .push(ExpectedConsumable::new(parsed.product_id, parsed.quantity));
            }
        }
    }
    result
}

/// Most decimal places a stored quantity keeps
pub const QUANTITY_SCALE: u32 = 3;

/// Largest quantity a consumption report stores
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 3);

/// Validate a consumed or expected quantity against what reports can store
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantities cannot be negative");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantities cannot exceed 999999999.999");
    }
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err("Quantities allow at most 3 decimal places");
    }
    Ok(())
}

/// Validate a consumable list before it is written
pub fn validate_expected_consumables(consumables: &[ExpectedConsumable]) -> Result<(), &'static str> {
    let mut seen = Vec::with_capacity(consumables.len());
    for c in consumables {
        if c.quantity <= Decimal::ZERO {
            return Err("Consumable quantities must be positive");
        }
        validate_quantity(c.quantity)?;
        if seen.contains(&c.product_id) {
            return Err("A product can appear only once per treatment");
        }
        seen.push(c.product_id);
    }
    Ok(())
}

// ============================================================================
// Packages and Prices
// ============================================================================

/// Validate a package's treatment list; repeats are allowed
pub fn validate_soin_ids(soin_ids: &[Uuid]) -> Result<(), &'static str> {
    if soin_ids.is_empty() {
        return Err("A package must include at least one treatment");
    }
    Ok(())
}

/// Validate a selling price or a cost
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Prices cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Versioned Edits
// ============================================================================

/// An edit applies only against the version it was made from
pub fn check_version(expected: i32, current: i32) -> Result<(), CatalogError> {
    if expected != current {
        return Err(CatalogError::StaleVersion { expected, current });
    }
    Ok(())
}

/// Validate stock fields of a product
pub fn validate_stock_levels(product: &Product) -> Result<(), &'static str> {
    if product.quantity < 0 {
        return Err("Stock quantity cannot be negative");
    }
    if product.min_quantity < 0 {
        return Err("Minimum quantity cannot be negative");
    }
    validate_price(product.unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_accepts_both_key_styles() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = json!([
            { "product_id": a, "quantity": 2 },
            { "productId": b, "quantity": "0.5" },
        ]);
        let normalized = normalize_expected_consumables(&raw);
        assert_eq!(normalized.dropped, 0);
        assert_eq!(
            normalized.consumables,
            vec![
                ExpectedConsumable::new(a, Decimal::from(2)),
                ExpectedConsumable::new(b, Decimal::new(5, 1)),
            ]
        );
    }

    #[test]
    fn test_normalize_drops_bad_entries() {
        let a = Uuid::new_v4();
        let raw = json!([
            { "product_id": a, "quantity": 0 },
            { "product_id": a, "quantity": -1 },
            { "product_id": "not-a-uuid", "quantity": 1 },
            { "quantity": 1 },
            "garbage",
        ]);
        let normalized = normalize_expected_consumables(&raw);
        assert!(normalized.consumables.is_empty());
        assert_eq!(normalized.dropped, 5);
    }

    #[test]
    fn test_normalize_merges_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = json!([
            { "product_id": a, "quantity": 1 },
            { "product_id": b, "quantity": 1 },
            { "product_id": a, "quantity": 2 },
        ]);
        let normalized = normalize_expected_consumables(&raw);
        assert_eq!(normalized.merged, 1);
        assert_eq!(normalized.consumables[0].product_id, a);
        assert_eq!(normalized.consumables[0].quantity, Decimal::from(3));
        assert_eq!(normalized.consumables[1].product_id, b);
    }

    #[test]
    fn test_normalize_non_array() {
        assert_eq!(normalize_expected_consumables(&json!(null)).dropped, 0);
        assert_eq!(normalize_expected_consumables(&json!({"a": 1})).dropped, 1);
    }

    #[test]
    fn test_validate_expected_consumables() {
        let a = Uuid::new_v4();
        assert!(validate_expected_consumables(&[]).is_ok());
        assert!(validate_expected_consumables(&[ExpectedConsumable::new(a, Decimal::ONE)]).is_ok());
        assert!(validate_expected_consumables(&[ExpectedConsumable::new(a, Decimal::ZERO)]).is_err());
        assert!(validate_expected_consumables(&[
            ExpectedConsumable::new(a, Decimal::ONE),
            ExpectedConsumable::new(a, Decimal::ONE),
        ])
        .is_err());
    }

    #[test]
    fn test_validate_soin_ids() {
        let a = Uuid::new_v4();
        assert!(validate_soin_ids(&[a, a]).is_ok());
        assert!(validate_soin_ids(&[]).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(MAX_QUANTITY, Decimal::new(999_999_999_999, 3));
        assert!(validate_quantity(Decimal::ZERO).is_ok());
        assert!(validate_quantity(MAX_QUANTITY).is_ok());
        // trailing zeros do not count as precision
        assert!(validate_quantity(Decimal::new(15000, 4)).is_ok());
        assert!(validate_quantity(Decimal::new(4, 4)).is_err());
        assert!(validate_quantity(MAX_QUANTITY + Decimal::new(1, 3)).is_err());
        assert!(validate_quantity(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_check_version() {
        assert!(check_version(3, 3).is_ok());
        assert_eq!(
            check_version(2, 3),
            Err(CatalogError::StaleVersion { expected: 2, current: 3 })
        );
    }
}

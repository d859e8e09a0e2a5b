//! Consumable roll-up for treatments and packages
//!
//! This path feeds display screens and is tolerant: unknown treatments add
//! nothing and unknown products resolve to a zero-cost placeholder line.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    AggregatedConsumable, CatalogSnapshot, ExpectedConsumable, Product, UNKNOWN_PRODUCT_NAME,
};

/// Merge the expected consumables of every treatment occurrence into one
/// per-product list.
///
/// A treatment listed N times contributes its quantities N times. The first
/// occurrence of a product fixes its position in the output.
pub fn aggregate(soin_ids: &[Uuid], catalog: &CatalogSnapshot) -> Vec<AggregatedConsumable> {
    let treatments = catalog.treatment_index();
    let occurrences = soin_ids
        .iter()
        .filter_map(|soin_id| treatments.get(soin_id).copied())
        .flat_map(|treatment| treatment.expected_consumables.iter());
    roll_up(occurrences, catalog)
}

/// Resolve a single treatment's expected list against the product catalog
pub fn resolve(
    consumables: &[ExpectedConsumable],
    catalog: &CatalogSnapshot,
) -> Vec<AggregatedConsumable> {
    roll_up(consumables, catalog)
}

/// Lines whose product id did not resolve
pub fn unresolved(consumables: &[AggregatedConsumable]) -> Vec<Uuid> {
    consumables
        .iter()
        .filter(|c| !c.resolved)
        .map(|c| c.product_id)
        .collect()
}

/// Sum quantities per product in first-seen order, then resolve each line
fn roll_up<'a>(
    consumables: impl IntoIterator<Item = &'a ExpectedConsumable>,
    catalog: &CatalogSnapshot,
) -> Vec<AggregatedConsumable> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
    for consumable in consumables {
        match totals.get_mut(&consumable.product_id) {
            Some(total) => *total = total.saturating_add(consumable.quantity),
            None => {
                order.push(consumable.product_id);
                totals.insert(consumable.product_id, consumable.quantity);
            }
        }
    }

    let products = catalog.product_index();
    order
        .into_iter()
        .map(|product_id| {
            let quantity = totals.get(&product_id).copied().unwrap_or(Decimal::ZERO);
            resolve_line(product_id, quantity, products.get(&product_id).copied())
        })
        .collect()
}

fn resolve_line(product_id: Uuid, quantity: Decimal, product: Option<&Product>) -> AggregatedConsumable {
    match product {
        Some(p) => AggregatedConsumable {
            product_id,
            product_name: p.name.clone(),
            unit: p.unit.clone(),
            quantity,
            unit_price: p.unit_price,
            resolved: true,
        },
        None => AggregatedConsumable {
            product_id,
            product_name: UNKNOWN_PRODUCT_NAME.to_string(),
            unit: String::new(),
            quantity,
            unit_price: Decimal::ZERO,
            resolved: false,
        },
    }
}

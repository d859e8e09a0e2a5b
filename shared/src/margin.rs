//! Cost basis, margin and price recommendation math
//!
//! Division edge cases never fail: a zero selling price yields a 0% margin
//! and ratios beyond the `Decimal` range saturate.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregation;
use crate::error::PricingError;
use crate::models::{
    classify_margin, AggregatedConsumable, CatalogSnapshot, ItemKind, Margin, MarginBand, Package,
    PriceRecommendation, PricingItem, PricingSummary, Treatment,
};

/// Accepted range for target margins used in price recommendations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingPolicy {
    pub min_target_margin: Decimal,
    /// Must stay below 100
    pub max_target_margin: Decimal,
    pub default_target_margin: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            min_target_margin: Decimal::ZERO,
            max_target_margin: Decimal::from(99),
            default_target_margin: Decimal::from(25),
        }
    }
}

impl PricingPolicy {
    pub fn check_target(&self, target: Decimal) -> Result<(), PricingError> {
        let out_of_range = target < self.min_target_margin
            || target > self.max_target_margin
            || target >= Decimal::ONE_HUNDRED;
        if out_of_range {
            return Err(PricingError::TargetMarginOutOfRange {
                target,
                min: self.min_target_margin,
                max: self.max_target_margin,
            });
        }
        Ok(())
    }
}

/// Total cost of a consumable list
pub fn cost(consumables: &[AggregatedConsumable]) -> Decimal {
    consumables
        .iter()
        .fold(Decimal::ZERO, |total, c| total.saturating_add(c.line_cost()))
}

/// Margin of a selling price over a cost
pub fn margin(selling_price: Decimal, cost: Decimal) -> Margin {
    let margin = selling_price.saturating_sub(cost);
    let margin_percentage = if selling_price > Decimal::ZERO {
        round_half_up(percentage_of(margin, selling_price))
    } else {
        0
    };
    Margin {
        margin,
        margin_percentage,
    }
}

/// `part / whole * 100`, saturating at `Decimal::MAX` or `Decimal::MIN`.
///
/// `whole` must be non-zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(if part.is_sign_negative() == whole.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        })
}

/// Round to the nearest integer, ties toward positive infinity.
///
/// Values outside the `i64` range clamp to `i64::MIN` / `i64::MAX`.
pub fn round_half_up(value: Decimal) -> i64 {
    let rounded = value.saturating_add(Decimal::new(5, 1)).floor();
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Smallest whole price achieving at least the target margin percentage
pub fn price_for_target_margin(
    cost: Decimal,
    target_percentage: Decimal,
    policy: &PricingPolicy,
) -> Result<Decimal, PricingError> {
    if cost < Decimal::ZERO {
        return Err(PricingError::NegativeCost);
    }
    policy.check_target(target_percentage)?;

    let keep = Decimal::ONE - target_percentage / Decimal::ONE_HUNDRED;
    cost.checked_div(keep)
        .map(|price| price.ceil())
        .ok_or(PricingError::PriceOverflow { cost })
}

/// Recommended price together with the margin it actually achieves
pub fn recommend(
    cost: Decimal,
    target_percentage: Decimal,
    policy: &PricingPolicy,
) -> Result<PriceRecommendation, PricingError> {
    let recommended_price = price_for_target_margin(cost, target_percentage, policy)?;
    Ok(PriceRecommendation {
        cost,
        target_margin_percentage: target_percentage,
        recommended_price,
        achieved: margin(recommended_price, cost),
    })
}

/// Pricing projection of a single treatment
pub fn pricing_item_for_treatment(treatment: &Treatment, catalog: &CatalogSnapshot) -> PricingItem {
    let consumables = aggregation::resolve(&treatment.expected_consumables, catalog);
    build_item(
        ItemKind::Treatment,
        treatment.id,
        &treatment.name,
        treatment.description.clone(),
        consumables,
        treatment.price,
    )
}

/// Pricing projection of a package, priced on its discounted price
pub fn pricing_item_for_package(package: &Package, catalog: &CatalogSnapshot) -> PricingItem {
    let consumables = aggregation::aggregate(&package.soin_ids, catalog);
    build_item(
        ItemKind::Package,
        package.id,
        &package.name,
        package.description.clone(),
        consumables,
        package.selling_price(),
    )
}

/// Every active treatment followed by every package
pub fn pricing_catalog(catalog: &CatalogSnapshot) -> Vec<PricingItem> {
    let treatments = catalog
        .treatments
        .iter()
        .filter(|t| t.is_active)
        .map(|t| pricing_item_for_treatment(t, catalog));
    let packages = catalog
        .packages
        .iter()
        .map(|p| pricing_item_for_package(p, catalog));
    treatments.chain(packages).collect()
}

/// Header figures for the pricing screen
pub fn summarize(items: &[PricingItem]) -> PricingSummary {
    let count_band = |band: MarginBand| items.iter().filter(|i| i.band == band).count();
    let average_margin_percentage = if items.is_empty() {
        Decimal::ZERO
    } else {
        let total: i64 = items.iter().map(|i| i.margin_percentage).sum();
        (Decimal::from(total) / Decimal::from(items.len())).round_dp(2)
    };

    PricingSummary {
        item_count: items.len(),
        average_margin_percentage,
        total_consumables_cost: items.iter().map(|i| i.consumables_cost).sum(),
        highly_profitable_count: count_band(MarginBand::HighlyProfitable),
        moderate_count: count_band(MarginBand::Moderate),
        low_count: count_band(MarginBand::Low),
    }
}

fn build_item(
    kind: ItemKind,
    id: uuid::Uuid,
    name: &str,
    description: Option<String>,
    consumables: Vec<AggregatedConsumable>,
    selling_price: Decimal,
) -> PricingItem {
    let consumables_cost = cost(&consumables);
    let m = margin(selling_price, consumables_cost);
    PricingItem {
        kind,
        id,
        name: name.to_string(),
        description,
        consumables,
        consumables_cost,
        selling_price,
        margin: m.margin,
        margin_percentage: m.margin_percentage,
        band: classify_margin(m.margin_percentage),
    }
}

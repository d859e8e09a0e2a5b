//! Pricing models derived from the catalog

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a consumable references a product missing from the catalog
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown product";

/// A consumable line resolved against the product catalog.
///
/// For packages this is the per-product aggregate across every treatment
/// occurrence; for a single treatment it mirrors the expected list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedConsumable {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// False when the product id did not resolve
    pub resolved: bool,
}

impl AggregatedConsumable {
    /// Cost of this line (quantity x unit price)
    pub fn line_cost(&self) -> Decimal {
        self.quantity.saturating_mul(self.unit_price)
    }
}

/// Kind of catalog entry a pricing item wraps
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Treatment,
    Package,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Treatment => "soin",
            ItemKind::Package => "forfait",
        }
    }
}

/// Margin of a selling price over a cost basis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Margin {
    pub margin: Decimal,
    /// Whole percentage, never above 100 for a non-negative cost
    pub margin_percentage: i64,
}

/// Profitability band of a margin percentage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarginBand {
    /// 30% and above
    HighlyProfitable,
    /// 15-29%
    Moderate,
    /// Below 15%
    Low,
}

impl MarginBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginBand::HighlyProfitable => "highly_profitable",
            MarginBand::Moderate => "moderate",
            MarginBand::Low => "low",
        }
    }
}

impl std::fmt::Display for MarginBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginBand::HighlyProfitable => write!(f, "Highly profitable"),
            MarginBand::Moderate => write!(f, "Moderate"),
            MarginBand::Low => write!(f, "Low"),
        }
    }
}

/// Classify a margin percentage into its band
pub fn classify_margin(margin_percentage: i64) -> MarginBand {
    match margin_percentage {
        p if p >= 30 => MarginBand::HighlyProfitable,
        15..=29 => MarginBand::Moderate,
        _ => MarginBand::Low,
    }
}

/// Cost and margin projection of a treatment or a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingItem {
    pub kind: ItemKind,
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub consumables: Vec<AggregatedConsumable>,
    pub consumables_cost: Decimal,
    pub selling_price: Decimal,
    pub margin: Decimal,
    pub margin_percentage: i64,
    pub band: MarginBand,
}

/// Header figures for a list of pricing items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSummary {
    pub item_count: usize,
    pub average_margin_percentage: Decimal,
    pub total_consumables_cost: Decimal,
    pub highly_profitable_count: usize,
    pub moderate_count: usize,
    pub low_count: usize,
}

/// Recommended selling price for a target margin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecommendation {
    pub cost: Decimal,
    pub target_margin_percentage: Decimal,
    pub recommended_price: Decimal,
    /// Margin actually achieved at the recommended price
    pub achieved: Margin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_bands() {
        assert_eq!(classify_margin(100), MarginBand::HighlyProfitable);
        assert_eq!(classify_margin(30), MarginBand::HighlyProfitable);
        assert_eq!(classify_margin(29), MarginBand::Moderate);
        assert_eq!(classify_margin(15), MarginBand::Moderate);
        assert_eq!(classify_margin(14), MarginBand::Low);
        assert_eq!(classify_margin(-40), MarginBand::Low);
    }

    #[test]
    fn test_line_cost() {
        let line = AggregatedConsumable {
            product_id: Uuid::nil(),
            product_name: "Seringue".to_string(),
            unit: "unit".to_string(),
            quantity: Decimal::new(25, 1),
            unit_price: Decimal::from(400),
            resolved: true,
        };
        assert_eq!(line.line_cost(), Decimal::from(1000));
    }
}

//! Flat export rows for pricing items

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::PricingItem;

/// One CSV row per pricing item
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricingExportRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub consumables: String,
    pub consumables_cost: Decimal,
    pub selling_price: Decimal,
    pub margin: Decimal,
    pub margin_percentage: i64,
    pub status: String,
}

impl From<&PricingItem> for PricingExportRow {
    fn from(item: &PricingItem) -> Self {
        Self {
            kind: item.kind.as_str().to_string(),
            name: item.name.clone(),
            description: item.description.clone().unwrap_or_default(),
            consumables: consumables_summary(item),
            consumables_cost: item.consumables_cost,
            selling_price: item.selling_price,
            margin: item.margin,
            margin_percentage: item.margin_percentage,
            status: item.band.to_string(),
        }
    }
}

/// "name xqty" entries joined with "; "
pub fn consumables_summary(item: &PricingItem) -> String {
    item.consumables
        .iter()
        .map(|c| format!("{} x{}", c.product_name, c.quantity.normalize()))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn export_rows(items: &[PricingItem]) -> Vec<PricingExportRow> {
    items.iter().map(PricingExportRow::from).collect()
}

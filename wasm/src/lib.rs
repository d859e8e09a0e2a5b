//! WebAssembly module for the clinic pricing platform
//!
//! Provides client-side computation for:
//! - Margin and recommended price previews
//! - Package consumable roll-up from a catalog snapshot
//! - Consumption variance previews
//! - Expiry warning severity

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::alerts::ThresholdPolicy;
use shared::margin::{self, PricingPolicy};
use shared::{aggregation, classify_margin, variance, CatalogSnapshot};

/// Margin of a selling price over a cost, as JSON `{margin, margin_percentage}`
#[wasm_bindgen]
pub fn calculate_margin(selling_price: f64, cost: f64) -> Result<String, JsValue> {
    margin_json(selling_price, cost).map_err(|e| JsValue::from_str(&e))
}

/// Smallest whole price reaching the target margin under the default bounds
#[wasm_bindgen]
pub fn price_for_target_margin(cost: f64, target_percentage: f64) -> Result<f64, JsValue> {
    recommended_price(cost, target_percentage).map_err(|e| JsValue::from_str(&e))
}

/// Display label of the band a margin percentage falls in
#[wasm_bindgen]
pub fn margin_band_label(margin_percentage: i32) -> String {
    classify_margin(i64::from(margin_percentage)).to_string()
}

/// Roll up a package's consumables from a JSON catalog snapshot
#[wasm_bindgen]
pub fn aggregate_package_consumables(snapshot_json: &str, package_id: &str) -> Result<String, JsValue> {
    package_consumables_json(snapshot_json, package_id).map_err(|e| JsValue::from_str(&e))
}

/// Variance preview as JSON `{variance_quantity, variance_percentage, cost_impact}`
#[wasm_bindgen]
pub fn calculate_variance(expected: f64, actual: f64, unit_price: f64) -> Result<String, JsValue> {
    variance_json(expected, actual, unit_price).map_err(|e| JsValue::from_str(&e))
}

/// Severity of an expiry warning for a date (YYYY-MM-DD) as seen today.
/// Returns undefined when the date is outside the warning window.
#[wasm_bindgen]
pub fn expiry_warning_severity(expiry_date: &str) -> Result<Option<String>, JsValue> {
    let today = js_sys::Date::new_0().to_iso_string();
    let today: String = today.into();
    expiry_severity_on(expiry_date, &today[..10]).map_err(|e| JsValue::from_str(&e))
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|_| format!("{} is not a finite number", field))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("Invalid {}: {}", field, e))
}

fn margin_json(selling_price: f64, cost: f64) -> Result<String, String> {
    let m = margin::margin(
        to_decimal(selling_price, "selling_price")?,
        to_decimal(cost, "cost")?,
    );
    serde_json::to_string(&m).map_err(|e| e.to_string())
}

fn recommended_price(cost: f64, target_percentage: f64) -> Result<f64, String> {
    let price = margin::price_for_target_margin(
        to_decimal(cost, "cost")?,
        to_decimal(target_percentage, "target_percentage")?,
        &PricingPolicy::default(),
    )
    .map_err(|e| e.to_string())?;
    Ok(price.to_f64().unwrap_or(0.0))
}

fn package_consumables_json(snapshot_json: &str, package_id: &str) -> Result<String, String> {
    let snapshot: CatalogSnapshot =
        serde_json::from_str(snapshot_json).map_err(|e| format!("Invalid snapshot JSON: {}", e))?;
    let package = snapshot
        .packages
        .iter()
        .find(|p| p.id.to_string() == package_id)
        .ok_or_else(|| format!("Package {} not found", package_id))?;

    let consumables = aggregation::aggregate(&package.soin_ids, &snapshot);
    let missing = aggregation::unresolved(&consumables);
    if !missing.is_empty() {
        warn(&format!(
            "Package {} references {} unknown product(s)",
            package_id,
            missing.len()
        ));
    }
    serde_json::to_string(&consumables).map_err(|e| e.to_string())
}

fn variance_json(expected: f64, actual: f64, unit_price: f64) -> Result<String, String> {
    let v = variance::variance(
        to_decimal(expected, "expected")?,
        to_decimal(actual, "actual")?,
        to_decimal(unit_price, "unit_price")?,
    );
    serde_json::to_string(&v).map_err(|e| e.to_string())
}

fn expiry_severity_on(expiry_date: &str, today: &str) -> Result<Option<String>, String> {
    let expiry = parse_date(expiry_date, "expiry_date")?;
    let today = parse_date(today, "today")?;
    Ok(ThresholdPolicy::default()
        .expiry_severity((expiry - today).num_days())
        .map(|s| s.as_str().to_string()))
}

#[cfg(target_arch = "wasm32")]
fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn warn(_message: &str) {}

//! Catalog models: products, treatments (soins) and packages (forfaits)

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consumable product held in stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unit label shown next to quantities (ml, unit, syringe...)
    pub unit: String,
    /// Purchase cost of one unit
    pub unit_price: Decimal,
    /// Advisory resale price, not used by margin math
    pub selling_price: Option<Decimal>,
    /// Current stock level
    pub quantity: i32,
    /// Reorder threshold
    pub min_quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
}

/// Planned usage of one product for a single performed treatment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectedConsumable {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

impl ExpectedConsumable {
    pub fn new(product_id: Uuid, quantity: Decimal) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A billable treatment ("soin")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Selling price of one session
    pub price: Decimal,
    /// Ordered, at most one entry per product
    pub expected_consumables: Vec<ExpectedConsumable>,
    pub is_active: bool,
    pub version: i32,
}

/// A bundle of treatments sold together ("forfait")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Ordered treatment ids; a repeated id is included once per occurrence
    pub soin_ids: Vec<Uuid>,
    /// List price, informational only
    pub prix_total: Decimal,
    /// Price actually charged for the whole package
    pub prix_reduit: Decimal,
    pub version: i32,
}

impl Package {
    /// The price margin math is computed against
    pub fn selling_price(&self) -> Decimal {
        self.prix_reduit
    }
}

/// An immutable view of the catalog fetched once per workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub treatments: Vec<Treatment>,
    pub packages: Vec<Package>,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>, treatments: Vec<Treatment>, packages: Vec<Package>) -> Self {
        Self {
            products,
            treatments,
            packages,
        }
    }

    pub fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn treatment(&self, id: Uuid) -> Option<&Treatment> {
        self.treatments.iter().find(|t| t.id == id)
    }

    pub fn package(&self, id: Uuid) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    /// Index products by id for repeated lookups
    pub fn product_index(&self) -> HashMap<Uuid, &Product> {
        self.products.iter().map(|p| (p.id, p)).collect()
    }

    /// Index treatments by id for repeated lookups
    pub fn treatment_index(&self) -> HashMap<Uuid, &Treatment> {
        self.treatments.iter().map(|t| (t.id, t)).collect()
    }
}

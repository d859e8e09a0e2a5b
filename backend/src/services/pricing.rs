//! Pricing service: consumable costs, margins and price recommendations
//!
//! Every operation works on one catalog snapshot so that a listing never
//! mixes prices read at different moments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::CatalogService;
use shared::aggregation;
use shared::export::export_rows;
use shared::margin::{self, PricingPolicy};
use shared::{AggregatedConsumable, PriceRecommendation, PricingItem, PricingSummary};

/// Pricing service
#[derive(Clone)]
pub struct PricingService {
    catalog: CatalogService,
    policy: PricingPolicy,
}

/// Input for a price recommendation; the cost comes from exactly one source
#[derive(Debug, Deserialize)]
pub struct RecommendationInput {
    pub cost: Option<Decimal>,
    pub soin_id: Option<Uuid>,
    pub forfait_id: Option<Uuid>,
    /// Falls back to the configured default target
    pub target_margin_percentage: Option<Decimal>,
}

/// Aggregated consumables of a package
#[derive(Debug, Serialize)]
pub struct PackageConsumables {
    pub forfait_id: Uuid,
    pub consumables: Vec<AggregatedConsumable>,
    pub consumables_cost: Decimal,
    pub unresolved_product_ids: Vec<Uuid>,
}

impl PricingService {
    pub fn new(db: PgPool, policy: PricingPolicy) -> Self {
        Self {
            catalog: CatalogService::new(db),
            policy,
        }
    }

    /// Pricing items for every active treatment and every package
    pub async fn list_items(&self) -> AppResult<Vec<PricingItem>> {
        let snapshot = self.catalog.snapshot().await?;
        let items = margin::pricing_catalog(&snapshot);
        warn_unresolved(&items);
        Ok(items)
    }

    /// Header figures over all pricing items
    pub async fn summary(&self) -> AppResult<PricingSummary> {
        let items = self.list_items().await?;
        Ok(margin::summarize(&items))
    }

    /// Pricing item of one active treatment
    pub async fn treatment_item(&self, soin_id: Uuid) -> AppResult<PricingItem> {
        let snapshot = self.catalog.snapshot().await?;
        let treatment = snapshot
            .treatment(soin_id)
            .ok_or_else(|| AppError::NotFound("Soin".to_string()))?;
        let item = margin::pricing_item_for_treatment(treatment, &snapshot);
        warn_unresolved(std::slice::from_ref(&item));
        Ok(item)
    }

    /// Pricing item of one package
    pub async fn package_item(&self, forfait_id: Uuid) -> AppResult<PricingItem> {
        let snapshot = self.catalog.snapshot().await?;
        let package = snapshot
            .package(forfait_id)
            .ok_or_else(|| AppError::NotFound("Forfait".to_string()))?;
        let item = margin::pricing_item_for_package(package, &snapshot);
        warn_unresolved(std::slice::from_ref(&item));
        Ok(item)
    }

    /// Consumables a package uses in total, one line per product
    pub async fn package_consumables(&self, forfait_id: Uuid) -> AppResult<PackageConsumables> {
        let snapshot = self.catalog.snapshot().await?;
        let package = snapshot
            .package(forfait_id)
            .ok_or_else(|| AppError::NotFound("Forfait".to_string()))?;

        let consumables = aggregation::aggregate(&package.soin_ids, &snapshot);
        let unresolved_product_ids = aggregation::unresolved(&consumables);
        if !unresolved_product_ids.is_empty() {
            tracing::warn!(
                forfait_id = %forfait_id,
                unresolved = unresolved_product_ids.len(),
                "Package references unknown products"
            );
        }

        Ok(PackageConsumables {
            forfait_id,
            consumables_cost: margin::cost(&consumables),
            consumables,
            unresolved_product_ids,
        })
    }

    /// Smallest whole price reaching the target margin
    pub async fn recommend(&self, input: RecommendationInput) -> AppResult<PriceRecommendation> {
        let target = input
            .target_margin_percentage
            .unwrap_or(self.policy.default_target_margin);

        let cost = match (input.cost, input.soin_id, input.forfait_id) {
            (Some(cost), None, None) => cost,
            (None, Some(soin_id), None) => self.treatment_item(soin_id).await?.consumables_cost,
            (None, None, Some(forfait_id)) => self.package_item(forfait_id).await?.consumables_cost,
            _ => {
                return Err(AppError::Validation {
                    field: "cost".to_string(),
                    message: "Provide exactly one of cost, soin_id or forfait_id".to_string(),
                    message_fr: "Indiquez exactement un coût, un soin ou un forfait".to_string(),
                })
            }
        };

        Ok(margin::recommend(cost, target, &self.policy)?)
    }

    /// Serialize pricing items as CSV
    pub fn export_to_csv(items: &[PricingItem]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in export_rows(items) {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn warn_unresolved(items: &[PricingItem]) {
    for item in items {
        let missing = aggregation::unresolved(&item.consumables);
        if !missing.is_empty() {
            tracing::warn!(
                item_id = %item.id,
                kind = item.kind.as_str(),
                unresolved = missing.len(),
                "Pricing item references unknown products; counted at zero cost"
            );
        }
    }
}

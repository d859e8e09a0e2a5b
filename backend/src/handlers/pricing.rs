//! HTTP handlers for pricing endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::pricing::{PackageConsumables, RecommendationInput};
use crate::services::PricingService;
use crate::AppState;
use shared::{PriceRecommendation, PricingItem, PricingSummary};

#[derive(Debug, Deserialize)]
pub struct PricingQuery {
    pub format: Option<String>, // "json" or "csv"
}

fn service(state: &AppState) -> PricingService {
    PricingService::new(state.db.clone(), state.config.pricing.clone())
}

/// List pricing items for every soin and forfait
pub async fn list_pricing(
    State(state): State<AppState>,
    Query(query): Query<PricingQuery>,
) -> AppResult<Response> {
    let items = service(&state).list_items().await?;

    if query.format.as_deref() == Some("csv") {
        let csv = PricingService::export_to_csv(&items)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"pricing.csv\""),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(items).into_response())
    }
}

/// Header figures for the pricing screen
pub async fn get_pricing_summary(State(state): State<AppState>) -> AppResult<Json<PricingSummary>> {
    let summary = service(&state).summary().await?;
    Ok(Json(summary))
}

/// Pricing of one soin
pub async fn get_soin_pricing(
    State(state): State<AppState>,
    Path(soin_id): Path<Uuid>,
) -> AppResult<Json<PricingItem>> {
    let item = service(&state).treatment_item(soin_id).await?;
    Ok(Json(item))
}

/// Pricing of one forfait
pub async fn get_forfait_pricing(
    State(state): State<AppState>,
    Path(forfait_id): Path<Uuid>,
) -> AppResult<Json<PricingItem>> {
    let item = service(&state).package_item(forfait_id).await?;
    Ok(Json(item))
}

/// Consumables used by a forfait, merged per product
pub async fn get_forfait_consumables(
    State(state): State<AppState>,
    Path(forfait_id): Path<Uuid>,
) -> AppResult<Json<PackageConsumables>> {
    let consumables = service(&state).package_consumables(forfait_id).await?;
    Ok(Json(consumables))
}

/// Recommended price for a target margin
pub async fn recommend_price(
    State(state): State<AppState>,
    Json(input): Json<RecommendationInput>,
) -> AppResult<Json<PriceRecommendation>> {
    let recommendation = service(&state).recommend(input).await?;
    Ok(Json(recommendation))
}

//! HTTP handlers for catalog endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{UpdateForfaitSoinsInput, UpdateSoinConsumablesInput};
use crate::services::CatalogService;
use crate::AppState;
use shared::{Package, Product, Treatment};

/// List active products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db);
    let products = service.list_active_products().await?;
    Ok(Json(products))
}

/// List active soins
pub async fn list_soins(State(state): State<AppState>) -> AppResult<Json<Vec<Treatment>>> {
    let service = CatalogService::new(state.db);
    let soins = service.list_active_treatments().await?;
    Ok(Json(soins))
}

/// List forfaits
pub async fn list_forfaits(State(state): State<AppState>) -> AppResult<Json<Vec<Package>>> {
    let service = CatalogService::new(state.db);
    let forfaits = service.list_packages().await?;
    Ok(Json(forfaits))
}

/// Replace a soin's expected consumables
pub async fn update_soin_consumables(
    State(state): State<AppState>,
    Path(soin_id): Path<Uuid>,
    Json(input): Json<UpdateSoinConsumablesInput>,
) -> AppResult<Json<Treatment>> {
    let service = CatalogService::new(state.db);
    let soin = service.update_soin_consumables(soin_id, input).await?;
    Ok(Json(soin))
}

/// Replace a forfait's soin list
pub async fn update_forfait_soins(
    State(state): State<AppState>,
    Path(forfait_id): Path<Uuid>,
    Json(input): Json<UpdateForfaitSoinsInput>,
) -> AppResult<Json<Package>> {
    let service = CatalogService::new(state.db);
    let forfait = service.update_forfait_soins(forfait_id, input).await?;
    Ok(Json(forfait))
}

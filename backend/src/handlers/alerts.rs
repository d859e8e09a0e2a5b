//! HTTP handlers for stock alert endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::AlertService;
use crate::AppState;
use shared::StockAlert;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub include_read: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: i64,
}

fn service(state: &AppState) -> AlertService {
    AlertService::new(state.db.clone(), state.config.alerts.clone())
}

/// List visible alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> AppResult<Json<Vec<StockAlert>>> {
    let include_read = query.include_read.unwrap_or(false);
    let alerts = service(&state).list(include_read).await?;
    Ok(Json(alerts))
}

/// Get unread alert count
pub async fn get_unread_count(State(state): State<AppState>) -> AppResult<Json<UnreadCountResponse>> {
    let count = service(&state).unread_count().await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Run alert generation
pub async fn generate_alerts(State(state): State<AppState>) -> AppResult<Json<Vec<StockAlert>>> {
    let created = service(&state).generate().await?;
    Ok(Json(created))
}

/// Mark an alert as read
pub async fn mark_alert_read(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<StockAlert>> {
    let alert = service(&state).mark_read(alert_id).await?;
    Ok(Json(alert))
}

/// Dismiss an alert
pub async fn dismiss_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<StockAlert>> {
    let alert = service(&state).dismiss(alert_id).await?;
    Ok(Json(alert))
}

/// Mark all alerts as read
pub async fn mark_all_alerts_read(
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = service(&state).mark_all_read().await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

//! HTTP handlers for consumption reconciliation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::consumption::{CreateReportInput, RecordSessionInput};
use crate::services::ConsumptionService;
use crate::AppState;
use shared::{ConsumptionReport, ConsumptionStatistics, ListLimit};

/// Query parameters for report listings
#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<u32>,
}

/// Reconcile one product line
pub async fn create_report(
    State(state): State<AppState>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<(StatusCode, Json<ConsumptionReport>)> {
    let service = ConsumptionService::new(state.db);
    let report = service.create_report(input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Reconcile a whole soin session of an appointment
pub async fn record_session(
    State(state): State<AppState>,
    Path((appointment_id, soin_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RecordSessionInput>,
) -> AppResult<(StatusCode, Json<Vec<ConsumptionReport>>)> {
    let service = ConsumptionService::new(state.db);
    let reports = service.record_session(appointment_id, soin_id, input).await?;
    Ok((StatusCode::CREATED, Json(reports)))
}

/// List reports, newest first
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<Json<Vec<ConsumptionReport>>> {
    let service = ConsumptionService::new(state.db);
    let reports = service
        .list_reports(ListLimit::from_request(query.limit))
        .await?;
    Ok(Json(reports))
}

/// Aggregate statistics over recent reports
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<Json<ConsumptionStatistics>> {
    let service = ConsumptionService::new(state.db);
    let statistics = service
        .statistics(ListLimit::from_request(query.limit))
        .await?;
    Ok(Json(statistics))
}

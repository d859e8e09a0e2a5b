//! Route definitions for the clinic pricing API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/catalog", catalog_routes())
        .nest("/pricing", pricing_routes())
        .nest("/consumption", consumption_routes())
        .nest("/alerts", alert_routes())
}

/// Catalog listings and versioned edits
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::list_products))
        .route("/soins", get(handlers::list_soins))
        .route("/soins/:soin_id/consumables", put(handlers::update_soin_consumables))
        .route("/forfaits", get(handlers::list_forfaits))
        .route("/forfaits/:forfait_id/soins", put(handlers::update_forfait_soins))
}

/// Costs, margins and recommendations
fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_pricing))
        .route("/summary", get(handlers::get_pricing_summary))
        .route("/recommendation", post(handlers::recommend_price))
        .route("/soins/:soin_id", get(handlers::get_soin_pricing))
        .route("/forfaits/:forfait_id", get(handlers::get_forfait_pricing))
        .route(
            "/forfaits/:forfait_id/consumables",
            get(handlers::get_forfait_consumables),
        )
}

/// Consumption reconciliation
fn consumption_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        .route("/statistics", get(handlers::get_statistics))
        .route(
            "/appointments/:appointment_id/soins/:soin_id",
            post(handlers::record_session),
        )
}

/// Stock alerts
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/generate", post(handlers::generate_alerts))
        .route("/read-all", put(handlers::mark_all_alerts_read))
        .route("/:alert_id/read", put(handlers::mark_alert_read))
        .route("/:alert_id/dismiss", put(handlers::dismiss_alert))
}

//! Stock alert service
//!
//! Supports:
//! - Generation runs over stock levels and recent consumption
//! - Listing, unread count
//! - Read and dismiss transitions

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::AlertsConfig;
use crate::error::{AppError, AppResult};
use crate::services::{CatalogService, ConsumptionService};
use shared::alerts::classify;
use shared::{fresh_drafts, visible_alerts, AlertDraft, AlertError, AlertSeverity, AlertType, ListLimit, StockAlert};

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    config: AlertsConfig,
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    product_id: Uuid,
    alert_type: String,
    severity: String,
    title: String,
    message: String,
    threshold_value: Decimal,
    current_value: Decimal,
    suggested_action: String,
    is_read: bool,
    is_dismissed: bool,
    expires_at: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for StockAlert {
    type Error = AlertError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(StockAlert {
            id: row.id,
            product_id: row.product_id,
            alert_type: AlertType::from_str(&row.alert_type)?,
            severity: AlertSeverity::from_str(&row.severity)?,
            title: row.title,
            message: row.message,
            threshold_value: row.threshold_value,
            current_value: row.current_value,
            suggested_action: row.suggested_action,
            is_read: row.is_read,
            is_dismissed: row.is_dismissed,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

const ALERT_COLUMNS: &str = "id, product_id, alert_type, severity, title, message, threshold_value, current_value, suggested_action, is_read, is_dismissed, expires_at, created_at";

impl AlertService {
    pub fn new(db: PgPool, config: AlertsConfig) -> Self {
        Self { db, config }
    }

    /// Classify the current state and store alerts not already visible.
    ///
    /// A (product, type) pair with a non-dismissed alert is skipped, so
    /// repeated runs never duplicate what the user already sees.
    pub async fn generate(&self) -> AppResult<Vec<StockAlert>> {
        let products = CatalogService::new(self.db.clone())
            .list_active_products()
            .await?;
        let reports = ConsumptionService::new(self.db.clone())
            .list_reports(ListLimit::from_request(Some(self.config.recent_report_limit)))
            .await?;

        let drafts = classify(&self.config.thresholds, &products, &reports, Utc::now());
        let classified = drafts.len();

        let mut tx = self.db.begin().await?;
        let existing = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM stock_alerts WHERE is_dismissed = false",
            ALERT_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(StockAlert::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        let drafts = fresh_drafts(drafts, &existing);

        let mut created = Vec::new();
        for draft in drafts {
            if let Some(row) = insert_draft(&mut tx, &draft).await? {
                created.push(StockAlert::try_from(row)?);
            }
        }
        tx.commit().await?;

        tracing::info!(
            classified,
            created = created.len(),
            "Alert generation run finished"
        );

        Ok(created)
    }

    /// Non-dismissed alerts, most severe and newest first
    pub async fn list(&self, include_read: bool) -> AppResult<Vec<StockAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM stock_alerts WHERE is_dismissed = false AND (is_read = false OR $1)",
            ALERT_COLUMNS
        ))
        .bind(include_read)
        .fetch_all(&self.db)
        .await?;

        let alerts = rows
            .into_iter()
            .map(StockAlert::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(visible_alerts(&alerts, include_read))
    }

    /// Number of unread, non-dismissed alerts
    pub async fn unread_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_alerts WHERE is_read = false AND is_dismissed = false",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Mark one alert as read
    pub async fn mark_read(&self, alert_id: Uuid) -> AppResult<StockAlert> {
        self.transition(alert_id, "read", StockAlert::mark_read).await
    }

    /// Dismiss one alert; it never shows again
    pub async fn dismiss(&self, alert_id: Uuid) -> AppResult<StockAlert> {
        self.transition(alert_id, "dismissed", StockAlert::dismiss).await
    }

    /// Mark every visible alert as read
    pub async fn mark_all_read(&self) -> AppResult<i64> {
        let result = sqlx::query(
            "UPDATE stock_alerts SET is_read = true WHERE is_read = false AND is_dismissed = false",
        )
        .execute(&self.db)
        .await?;

        tracing::info!(updated = result.rows_affected(), "Marked all alerts as read");
        Ok(result.rows_affected() as i64)
    }

    /// Apply a lifecycle transition under a row lock.
    ///
    /// Unknown and dismissed alerts are both reported as not found and left
    /// untouched.
    async fn transition(
        &self,
        alert_id: Uuid,
        label: &'static str,
        apply: fn(&mut StockAlert) -> Result<(), AlertError>,
    ) -> AppResult<StockAlert> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM stock_alerts WHERE id = $1 FOR UPDATE",
            ALERT_COLUMNS
        ))
        .bind(alert_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        let mut alert = StockAlert::try_from(row)?;
        apply(&mut alert)?;

        sqlx::query("UPDATE stock_alerts SET is_read = $2, is_dismissed = $3 WHERE id = $1")
            .bind(alert.id)
            .bind(alert.is_read)
            .bind(alert.is_dismissed)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(alert_id = %alert_id, state = label, "Alert transitioned");
        Ok(alert)
    }
}

/// Insert a draft; a concurrent run that stored the same pair first wins
async fn insert_draft(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    draft: &AlertDraft,
) -> AppResult<Option<AlertRow>> {
    let row = sqlx::query_as::<_, AlertRow>(&format!(
        r#"
        INSERT INTO stock_alerts (
            product_id, alert_type, severity, title, message,
            threshold_value, current_value, suggested_action, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (product_id, alert_type) WHERE is_dismissed = false DO NOTHING
        RETURNING {}
        "#,
        ALERT_COLUMNS
    ))
    .bind(draft.product_id)
    .bind(draft.alert_type.as_str())
    .bind(draft.severity.as_str())
    .bind(&draft.title)
    .bind(&draft.message)
    .bind(draft.threshold_value)
    .bind(draft.current_value)
    .bind(&draft.suggested_action)
    .bind(draft.expires_at)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

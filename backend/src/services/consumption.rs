//! Consumption service: reconciles recorded usage against expected consumables
//!
//! Reports are financial records. They are computed by the shared engine
//! against entities loaded for the request and written in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppResult;
use crate::services::CatalogService;
use shared::variance::{self, ReconciliationScope};
use shared::{
    validate_quantity, ConsumptionReport, ConsumptionStatistics, ListLimit, NewConsumptionReport,
    RecordedConsumption,
};

/// Consumption service
#[derive(Clone)]
pub struct ConsumptionService {
    db: PgPool,
    catalog: CatalogService,
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: Uuid,
    appointment_id: Uuid,
    soin_id: Uuid,
    product_id: Uuid,
    expected_quantity: Decimal,
    actual_quantity: Decimal,
    variance_quantity: Decimal,
    variance_percentage: Decimal,
    cost_impact: Decimal,
    report_date: DateTime<Utc>,
}

impl From<ReportRow> for ConsumptionReport {
    fn from(row: ReportRow) -> Self {
        ConsumptionReport {
            id: row.id,
            appointment_id: row.appointment_id,
            soin_id: row.soin_id,
            product_id: row.product_id,
            expected_quantity: row.expected_quantity,
            actual_quantity: row.actual_quantity,
            variance_quantity: row.variance_quantity,
            variance_percentage: row.variance_percentage,
            cost_impact: row.cost_impact,
            report_date: row.report_date,
        }
    }
}

/// Input for reconciling a single product line
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportInput {
    pub appointment_id: Uuid,
    pub soin_id: Uuid,
    pub product_id: Uuid,
    #[validate(custom = "storable_quantity")]
    pub expected_quantity: Decimal,
    #[validate(custom = "storable_quantity")]
    pub actual_quantity: Decimal,
}

/// Quantities must fit the NUMERIC(12, 3) report columns unchanged
fn storable_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    validate_quantity(*quantity).map_err(|reason| {
        let mut err = ValidationError::new("quantity");
        err.message = Some(reason.into());
        err
    })
}

/// Input for reconciling a whole treatment session
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSessionInput {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub consumables: Vec<RecordedConsumption>,
}

const REPORT_COLUMNS: &str = "id, appointment_id, soin_id, product_id, expected_quantity, actual_quantity, variance_quantity, variance_percentage, cost_impact, report_date";

impl ConsumptionService {
    pub fn new(db: PgPool) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            db,
        }
    }

    /// Reconcile and store one product line
    pub async fn create_report(&self, input: CreateReportInput) -> AppResult<ConsumptionReport> {
        input.validate()?;
        let scope = self
            .load_scope(input.appointment_id, input.soin_id, &[input.product_id])
            .await?;

        let new_report = variance::reconcile(
            &scope,
            input.appointment_id,
            input.soin_id,
            input.product_id,
            input.expected_quantity,
            input.actual_quantity,
            Utc::now(),
        )?;

        let mut tx = self.db.begin().await?;
        let report = insert_report(&mut tx, new_report).await?;
        tx.commit().await?;

        tracing::info!(
            report_id = %report.id,
            appointment_id = %report.appointment_id,
            product_id = %report.product_id,
            variance = %report.variance_quantity,
            "Consumption report created"
        );

        Ok(report)
    }

    /// Reconcile a session against the treatment's expected consumables.
    ///
    /// Nothing is stored unless every line reconciles.
    pub async fn record_session(
        &self,
        appointment_id: Uuid,
        soin_id: Uuid,
        input: RecordSessionInput,
    ) -> AppResult<Vec<ConsumptionReport>> {
        input.validate()?;

        let mut product_ids: Vec<Uuid> = input.consumables.iter().map(|c| c.product_id).collect();
        if let Some(treatment) = self.catalog.find_soin(soin_id).await? {
            product_ids.extend(treatment.expected_consumables.iter().map(|c| c.product_id));
        }
        product_ids.sort();
        product_ids.dedup();

        let scope = self.load_scope(appointment_id, soin_id, &product_ids).await?;
        let new_reports = variance::reconcile_session(
            &scope,
            appointment_id,
            soin_id,
            &input.consumables,
            Utc::now(),
        )?;

        let mut tx = self.db.begin().await?;
        let mut reports = Vec::with_capacity(new_reports.len());
        for new_report in new_reports {
            reports.push(insert_report(&mut tx, new_report).await?);
        }
        tx.commit().await?;

        tracing::info!(
            appointment_id = %appointment_id,
            soin_id = %soin_id,
            reports = reports.len(),
            "Session consumption reconciled"
        );

        Ok(reports)
    }

    /// Most recent reports first
    pub async fn list_reports(&self, limit: ListLimit) -> AppResult<Vec<ConsumptionReport>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {}
            FROM consumption_reports
            ORDER BY report_date DESC, created_at DESC
            LIMIT $1
            "#,
            REPORT_COLUMNS
        ))
        .bind(limit.as_i64())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ConsumptionReport::from).collect())
    }

    /// Statistics over the most recent reports
    pub async fn statistics(&self, limit: ListLimit) -> AppResult<ConsumptionStatistics> {
        let reports = self.list_reports(limit).await?;
        Ok(variance::statistics(&reports))
    }

    /// Load the entities a reconciliation may reference
    async fn load_scope(
        &self,
        appointment_id: Uuid,
        soin_id: Uuid,
        product_ids: &[Uuid],
    ) -> AppResult<ReconciliationScope> {
        let appointment_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM appointments WHERE id = $1)")
                .bind(appointment_id)
                .fetch_one(&self.db)
                .await?;

        Ok(ReconciliationScope {
            appointment_ids: if appointment_exists {
                vec![appointment_id]
            } else {
                Vec::new()
            },
            treatments: self.catalog.find_soin(soin_id).await?.into_iter().collect(),
            products: self.catalog.find_products(product_ids).await?,
        })
    }
}

async fn insert_report(
    tx: &mut Transaction<'_, Postgres>,
    report: NewConsumptionReport,
) -> AppResult<ConsumptionReport> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        INSERT INTO consumption_reports (
            appointment_id, soin_id, product_id, expected_quantity, actual_quantity,
            variance_quantity, variance_percentage, cost_impact, report_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        REPORT_COLUMNS
    ))
    .bind(report.appointment_id)
    .bind(report.soin_id)
    .bind(report.product_id)
    .bind(report.expected_quantity)
    .bind(report.actual_quantity)
    .bind(report.variance_quantity)
    .bind(report.variance_percentage)
    .bind(report.cost_impact)
    .bind(report.report_date)
    .fetch_one(&mut **tx)
    .await?;

    Ok(ConsumptionReport::from(row))
}

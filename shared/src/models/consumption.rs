//! Consumption variance models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expected versus recorded usage of one product during one appointment.
/// Immutable once created; the cost impact freezes the unit price of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionReport {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub soin_id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub variance_quantity: Decimal,
    pub variance_percentage: Decimal,
    pub cost_impact: Decimal,
    pub report_date: DateTime<Utc>,
}

/// A report computed but not yet persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewConsumptionReport {
    pub appointment_id: Uuid,
    pub soin_id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub variance_quantity: Decimal,
    pub variance_percentage: Decimal,
    pub cost_impact: Decimal,
    pub report_date: DateTime<Utc>,
}

impl NewConsumptionReport {
    /// Attach the identity assigned by the store
    pub fn into_report(self, id: Uuid) -> ConsumptionReport {
        ConsumptionReport {
            id,
            appointment_id: self.appointment_id,
            soin_id: self.soin_id,
            product_id: self.product_id,
            expected_quantity: self.expected_quantity,
            actual_quantity: self.actual_quantity,
            variance_quantity: self.variance_quantity,
            variance_percentage: self.variance_percentage,
            cost_impact: self.cost_impact,
            report_date: self.report_date,
        }
    }
}

/// Quantity actually used for a product during a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedConsumption {
    pub product_id: Uuid,
    pub actual_quantity: Decimal,
}

/// Variance of one product averaged over its reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariance {
    pub product_id: Uuid,
    pub average_variance: Decimal,
    pub total_cost_impact: Decimal,
    pub report_count: usize,
}

/// Aggregate figures over a set of consumption reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionStatistics {
    pub total_reports: usize,
    /// Mean variance percentage across all reports
    pub average_variance: Decimal,
    /// Sum of cost impacts
    pub cost_impact: Decimal,
    /// Products used above plan on average, worst first, at most five
    pub top_overconsumed_products: Vec<ProductVariance>,
}

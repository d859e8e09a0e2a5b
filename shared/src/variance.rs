//! Expected versus recorded consumption reconciliation
//!
//! Unlike aggregation, reconciliation is strict: a report is a durable
//! financial record and every entity it references must exist.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::margin::percentage_of;
use crate::models::{
    ConsumptionReport, ConsumptionStatistics, NewConsumptionReport, Product, ProductVariance,
    RecordedConsumption, Treatment,
};
use crate::validation::validate_quantity;

/// How many products the overconsumption ranking keeps
pub const TOP_OVERCONSUMED_LIMIT: usize = 5;

/// Entity lookups a reconciliation must succeed against
pub trait ReconciliationLookup {
    fn appointment_exists(&self, id: Uuid) -> bool;
    fn treatment(&self, id: Uuid) -> Option<&Treatment>;
    fn product(&self, id: Uuid) -> Option<&Product>;
}

/// Entities fetched for one reconciliation request
#[derive(Debug, Clone, Default)]
pub struct ReconciliationScope {
    pub appointment_ids: Vec<Uuid>,
    pub treatments: Vec<Treatment>,
    pub products: Vec<Product>,
}

impl ReconciliationLookup for ReconciliationScope {
    fn appointment_exists(&self, id: Uuid) -> bool {
        self.appointment_ids.contains(&id)
    }

    fn treatment(&self, id: Uuid) -> Option<&Treatment> {
        self.treatments.iter().find(|t| t.id == id)
    }

    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// Signed variance figures for one product line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Variance {
    pub variance_quantity: Decimal,
    /// 0 when nothing was expected
    pub variance_percentage: Decimal,
    pub cost_impact: Decimal,
}

/// Compute variance, variance percentage and cost impact.
///
/// Figures beyond the `Decimal` range saturate instead of failing.
pub fn variance(expected: Decimal, actual: Decimal, unit_price: Decimal) -> Variance {
    let variance_quantity = actual.saturating_sub(expected);
    let variance_percentage = if expected > Decimal::ZERO {
        percentage_of(variance_quantity, expected)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };
    Variance {
        variance_quantity,
        variance_percentage,
        cost_impact: variance_quantity.saturating_mul(unit_price),
    }
}

/// Reconcile one product line of a completed appointment
pub fn reconcile<L: ReconciliationLookup>(
    lookup: &L,
    appointment_id: Uuid,
    soin_id: Uuid,
    product_id: Uuid,
    expected_quantity: Decimal,
    actual_quantity: Decimal,
    report_date: DateTime<Utc>,
) -> Result<NewConsumptionReport, ReconcileError> {
    check_quantity("expected_quantity", expected_quantity)?;
    check_quantity("actual_quantity", actual_quantity)?;
    if !lookup.appointment_exists(appointment_id) {
        return Err(ReconcileError::UnknownAppointment(appointment_id));
    }
    if lookup.treatment(soin_id).is_none() {
        return Err(ReconcileError::UnknownTreatment(soin_id));
    }
    let product = lookup
        .product(product_id)
        .ok_or(ReconcileError::UnknownProduct(product_id))?;

    let v = variance(expected_quantity, actual_quantity, product.unit_price);
    Ok(NewConsumptionReport {
        appointment_id,
        soin_id,
        product_id,
        expected_quantity,
        actual_quantity,
        variance_quantity: v.variance_quantity,
        variance_percentage: v.variance_percentage,
        cost_impact: v.cost_impact,
        report_date,
    })
}

/// Reconcile a whole treatment session against its expected consumables.
///
/// Expected products missing from `recorded` count as unused (actual 0);
/// recorded products the treatment does not plan for get an expected
/// quantity of 0. Fails as a whole if any referenced entity is unknown.
pub fn reconcile_session<L: ReconciliationLookup>(
    lookup: &L,
    appointment_id: Uuid,
    soin_id: Uuid,
    recorded: &[RecordedConsumption],
    report_date: DateTime<Utc>,
) -> Result<Vec<NewConsumptionReport>, ReconcileError> {
    if !lookup.appointment_exists(appointment_id) {
        return Err(ReconcileError::UnknownAppointment(appointment_id));
    }
    let treatment = lookup
        .treatment(soin_id)
        .ok_or(ReconcileError::UnknownTreatment(soin_id))?;

    let mut actuals: HashMap<Uuid, Decimal> = HashMap::new();
    let mut extra_order: Vec<Uuid> = Vec::new();
    for line in recorded {
        check_quantity("actual_quantity", line.actual_quantity)?;
        let planned = treatment
            .expected_consumables
            .iter()
            .any(|c| c.product_id == line.product_id);
        if !planned && !actuals.contains_key(&line.product_id) {
            extra_order.push(line.product_id);
        }
        *actuals.entry(line.product_id).or_insert(Decimal::ZERO) += line.actual_quantity;
    }

    let planned_lines = treatment.expected_consumables.iter().map(|c| {
        let actual = actuals.get(&c.product_id).copied().unwrap_or(Decimal::ZERO);
        (c.product_id, c.quantity, actual)
    });
    let unplanned_lines = extra_order.iter().map(|id| {
        let actual = actuals.get(id).copied().unwrap_or(Decimal::ZERO);
        (*id, Decimal::ZERO, actual)
    });

    planned_lines
        .chain(unplanned_lines)
        .map(|(product_id, expected, actual)| {
            reconcile(
                lookup,
                appointment_id,
                soin_id,
                product_id,
                expected,
                actual,
                report_date,
            )
        })
        .collect()
}

/// Per-product averages in order of first appearance
pub fn variance_by_product(reports: &[ConsumptionReport]) -> Vec<ProductVariance> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut groups: HashMap<Uuid, (Decimal, Decimal, usize)> = HashMap::new();

    for report in reports {
        let entry = groups.entry(report.product_id).or_insert_with(|| {
            order.push(report.product_id);
            (Decimal::ZERO, Decimal::ZERO, 0)
        });
        entry.0 += report.variance_percentage;
        entry.1 += report.cost_impact;
        entry.2 += 1;
    }

    order
        .into_iter()
        .filter_map(|product_id| {
            let (variance_sum, cost_impact, count) = groups.get(&product_id).copied()?;
            Some(ProductVariance {
                product_id,
                average_variance: mean(variance_sum, count),
                total_cost_impact: cost_impact,
                report_count: count,
            })
        })
        .collect()
}

/// Aggregate statistics over a set of reports
pub fn statistics(reports: &[ConsumptionReport]) -> ConsumptionStatistics {
    let variance_sum: Decimal = reports.iter().map(|r| r.variance_percentage).sum();

    let mut overconsumed: Vec<ProductVariance> = variance_by_product(reports)
        .into_iter()
        .filter(|p| p.average_variance > Decimal::ZERO)
        .collect();
    // stable sort keeps first-appearance order among ties
    overconsumed.sort_by(|a, b| b.average_variance.cmp(&a.average_variance));
    overconsumed.truncate(TOP_OVERCONSUMED_LIMIT);

    ConsumptionStatistics {
        total_reports: reports.len(),
        average_variance: mean(variance_sum, reports.len()),
        cost_impact: reports.iter().map(|r| r.cost_impact).sum(),
        top_overconsumed_products: overconsumed,
    }
}

fn mean(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (sum / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_quantity(field: &'static str, quantity: Decimal) -> Result<(), ReconcileError> {
    if quantity < Decimal::ZERO {
        return Err(ReconcileError::NegativeQuantity { field });
    }
    validate_quantity(quantity).map_err(|reason| ReconcileError::InvalidQuantity { field, reason })
}

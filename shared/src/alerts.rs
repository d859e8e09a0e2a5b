//! Alert classification over stock levels and consumption reports
//!
//! Severity assignment goes through [`ClassificationPolicy`] so the bands can
//! be swapped or configured. [`ThresholdPolicy`] is the default:
//!
//! | alert | trigger | critical | high | medium | low |
//! |---|---|---|---|---|---|
//! | low_stock | quantity <= min quantity | ratio <= 0.50 | ratio <= 0.75 | otherwise | - |
//! | high_consumption | average variance >= 10% | >= 100% | >= 50% | >= 25% | >= 10% |
//! | cost_variance | abs(total cost impact) >= 10 000 | >= 100% | >= 50% | >= 25% | otherwise |
//! | expiry_warning | expires within 30 days | expired | <= 7 days | <= 14 days | otherwise |

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AlertDraft, AlertSeverity, AlertType, ConsumptionReport, Product, ProductVariance};
use crate::variance::variance_by_product;

/// Severity and the figures that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finding {
    pub severity: AlertSeverity,
    pub threshold_value: Decimal,
    pub current_value: Decimal,
}

/// Decides whether a signal deserves an alert and how severe it is
pub trait ClassificationPolicy {
    fn low_stock(&self, product: &Product) -> Option<Finding>;
    fn high_consumption(&self, variance: &ProductVariance) -> Option<Finding>;
    fn cost_variance(&self, variance: &ProductVariance) -> Option<Finding>;
    fn expiry(&self, product: &Product, today: NaiveDate) -> Option<Finding>;
}

/// Default banded policy; every threshold is configurable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdPolicy {
    /// Stock at or below this share of the minimum is critical
    pub low_stock_critical_ratio: Decimal,
    pub low_stock_high_ratio: Decimal,
    /// Variance percentage bands, highest first
    pub variance_critical_percentage: Decimal,
    pub variance_high_percentage: Decimal,
    pub variance_medium_percentage: Decimal,
    pub variance_low_percentage: Decimal,
    /// Absolute summed cost impact that raises a cost_variance alert
    pub cost_impact_threshold: Decimal,
    pub expiry_lookahead_days: i64,
    pub expiry_high_days: i64,
    pub expiry_medium_days: i64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            low_stock_critical_ratio: Decimal::new(50, 2),
            low_stock_high_ratio: Decimal::new(75, 2),
            variance_critical_percentage: Decimal::from(100),
            variance_high_percentage: Decimal::from(50),
            variance_medium_percentage: Decimal::from(25),
            variance_low_percentage: Decimal::from(10),
            cost_impact_threshold: Decimal::from(10_000),
            expiry_lookahead_days: 30,
            expiry_high_days: 7,
            expiry_medium_days: 14,
        }
    }
}

impl ThresholdPolicy {
    /// Band a variance percentage magnitude; None below the low band
    pub fn variance_severity(&self, percentage: Decimal) -> Option<AlertSeverity> {
        let magnitude = percentage.abs();
        if magnitude >= self.variance_critical_percentage {
            Some(AlertSeverity::Critical)
        } else if magnitude >= self.variance_high_percentage {
            Some(AlertSeverity::High)
        } else if magnitude >= self.variance_medium_percentage {
            Some(AlertSeverity::Medium)
        } else if magnitude >= self.variance_low_percentage {
            Some(AlertSeverity::Low)
        } else {
            None
        }
    }

    /// Band the number of days left before expiry; None outside the window
    pub fn expiry_severity(&self, days_until: i64) -> Option<AlertSeverity> {
        if days_until > self.expiry_lookahead_days {
            None
        } else if days_until <= 0 {
            Some(AlertSeverity::Critical)
        } else if days_until <= self.expiry_high_days {
            Some(AlertSeverity::High)
        } else if days_until <= self.expiry_medium_days {
            Some(AlertSeverity::Medium)
        } else {
            Some(AlertSeverity::Low)
        }
    }
}

impl ClassificationPolicy for ThresholdPolicy {
    fn low_stock(&self, product: &Product) -> Option<Finding> {
        if product.quantity > product.min_quantity {
            return None;
        }
        let ratio = if product.min_quantity > 0 {
            Decimal::from(product.quantity.max(0)) / Decimal::from(product.min_quantity)
        } else {
            Decimal::ZERO
        };
        let severity = if ratio <= self.low_stock_critical_ratio {
            AlertSeverity::Critical
        } else if ratio <= self.low_stock_high_ratio {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        Some(Finding {
            severity,
            threshold_value: Decimal::from(product.min_quantity),
            current_value: Decimal::from(product.quantity),
        })
    }

    fn high_consumption(&self, variance: &ProductVariance) -> Option<Finding> {
        if variance.average_variance <= Decimal::ZERO {
            return None;
        }
        let severity = self.variance_severity(variance.average_variance)?;
        Some(Finding {
            severity,
            threshold_value: self.variance_low_percentage,
            current_value: variance.average_variance,
        })
    }

    fn cost_variance(&self, variance: &ProductVariance) -> Option<Finding> {
        let magnitude = variance.total_cost_impact.abs();
        if magnitude < self.cost_impact_threshold {
            return None;
        }
        let severity = self
            .variance_severity(variance.average_variance)
            .unwrap_or(AlertSeverity::Low);
        Some(Finding {
            severity,
            threshold_value: self.cost_impact_threshold,
            current_value: variance.total_cost_impact,
        })
    }

    fn expiry(&self, product: &Product, today: NaiveDate) -> Option<Finding> {
        let expiry_date = product.expiry_date?;
        let days_until = (expiry_date - today).num_days();
        let severity = self.expiry_severity(days_until)?;
        Some(Finding {
            severity,
            threshold_value: Decimal::from(self.expiry_lookahead_days),
            current_value: Decimal::from(days_until),
        })
    }
}

/// Classify stock levels and recent reports into alert drafts.
///
/// Inactive products are ignored, as are reports for products missing from
/// `products`.
pub fn classify<P: ClassificationPolicy + ?Sized>(
    policy: &P,
    products: &[Product],
    recent_reports: &[ConsumptionReport],
    now: DateTime<Utc>,
) -> Vec<AlertDraft> {
    let today = now.date_naive();
    let mut drafts = Vec::new();

    for product in products.iter().filter(|p| p.is_active) {
        if let Some(finding) = policy.low_stock(product) {
            drafts.push(low_stock_draft(product, finding));
        }
        if let Some(finding) = policy.expiry(product, today) {
            drafts.push(expiry_draft(product, finding));
        }
    }

    for variance in variance_by_product(recent_reports) {
        let Some(product) = products
            .iter()
            .find(|p| p.id == variance.product_id && p.is_active)
        else {
            continue;
        };
        if let Some(finding) = policy.high_consumption(&variance) {
            drafts.push(high_consumption_draft(product, &variance, finding));
        }
        if let Some(finding) = policy.cost_variance(&variance) {
            drafts.push(cost_variance_draft(product, &variance, finding));
        }
    }

    drafts
}

fn low_stock_draft(product: &Product, finding: Finding) -> AlertDraft {
    AlertDraft {
        product_id: product.id,
        alert_type: AlertType::LowStock,
        severity: finding.severity,
        title: format!("Low stock: {}", product.name),
        message: format!(
            "{} has {} {} left, reorder threshold is {}",
            product.name, product.quantity, product.unit, product.min_quantity
        ),
        threshold_value: finding.threshold_value,
        current_value: finding.current_value,
        suggested_action: format!(
            "Reorder {} to bring stock back above {} {}",
            product.name, product.min_quantity, product.unit
        ),
        expires_at: None,
    }
}

fn expiry_draft(product: &Product, finding: Finding) -> AlertDraft {
    let days = finding.current_value;
    let message = if days <= Decimal::ZERO {
        format!("{} has reached its expiry date", product.name)
    } else {
        format!("{} expires in {} days", product.name, days)
    };
    AlertDraft {
        product_id: product.id,
        alert_type: AlertType::ExpiryWarning,
        severity: finding.severity,
        title: format!("Expiry warning: {}", product.name),
        message,
        threshold_value: finding.threshold_value,
        current_value: finding.current_value,
        suggested_action: "Use the oldest units first or withdraw expired stock".to_string(),
        expires_at: product.expiry_date,
    }
}

fn high_consumption_draft(product: &Product, variance: &ProductVariance, finding: Finding) -> AlertDraft {
    AlertDraft {
        product_id: product.id,
        alert_type: AlertType::HighConsumption,
        severity: finding.severity,
        title: format!("High consumption: {}", product.name),
        message: format!(
            "{} is used {}% above plan on average over {} reports",
            product.name, variance.average_variance, variance.report_count
        ),
        threshold_value: finding.threshold_value,
        current_value: finding.current_value,
        suggested_action: "Review the expected quantities of the treatments using this product"
            .to_string(),
        expires_at: None,
    }
}

fn cost_variance_draft(product: &Product, variance: &ProductVariance, finding: Finding) -> AlertDraft {
    AlertDraft {
        product_id: product.id,
        alert_type: AlertType::CostVariance,
        severity: finding.severity,
        title: format!("Cost variance: {}", product.name),
        message: format!(
            "Consumption gaps on {} add up to {} over {} reports",
            product.name, variance.total_cost_impact, variance.report_count
        ),
        threshold_value: finding.threshold_value,
        current_value: finding.current_value,
        suggested_action: "Check treatment prices against the actual material cost".to_string(),
        expires_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewConsumptionReport;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn product(quantity: i32, min_quantity: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Gel échographique".to_string(),
            unit: "ml".to_string(),
            unit_price: Decimal::from(500),
            selling_price: None,
            quantity,
            min_quantity,
            expiry_date: None,
            is_active: true,
        }
    }

    fn report(product_id: Uuid, variance_percentage: i64, cost_impact: i64) -> ConsumptionReport {
        NewConsumptionReport {
            appointment_id: Uuid::new_v4(),
            soin_id: Uuid::new_v4(),
            product_id,
            expected_quantity: Decimal::from(2),
            actual_quantity: Decimal::from(3),
            variance_quantity: Decimal::ONE,
            variance_percentage: Decimal::from(variance_percentage),
            cost_impact: Decimal::from(cost_impact),
            report_date: now(),
        }
        .into_report(Uuid::new_v4())
    }

    fn severities(drafts: &[AlertDraft], alert_type: AlertType) -> Vec<AlertSeverity> {
        drafts
            .iter()
            .filter(|d| d.alert_type == alert_type)
            .map(|d| d.severity)
            .collect()
    }

    #[test]
    fn test_low_stock_bands() {
        let policy = ThresholdPolicy::default();
        let products = vec![
            product(11, 10),
            product(10, 10),
            product(7, 10),
            product(5, 10),
            product(0, 10),
            product(0, 0),
        ];
        let drafts = classify(&policy, &products, &[], now());
        assert_eq!(
            severities(&drafts, AlertType::LowStock),
            vec![
                AlertSeverity::Medium,
                AlertSeverity::High,
                AlertSeverity::Critical,
                AlertSeverity::Critical,
                AlertSeverity::Critical,
            ]
        );
        let first = &drafts[0];
        assert_eq!(first.threshold_value, Decimal::from(10));
        assert_eq!(first.current_value, Decimal::from(10));
    }

    #[test]
    fn test_inactive_products_ignored() {
        let mut p = product(0, 10);
        p.is_active = false;
        assert!(classify(&ThresholdPolicy::default(), &[p], &[], now()).is_empty());
    }

    #[test]
    fn test_expiry_window() {
        let policy = ThresholdPolicy::default();
        let today = now().date_naive();
        let mut products = Vec::new();
        for days in [-2, 0, 5, 10, 20, 31] {
            let mut p = product(100, 10);
            p.expiry_date = Some(today + chrono::Duration::days(days));
            products.push(p);
        }
        let drafts = classify(&policy, &products, &[], now());
        assert_eq!(
            severities(&drafts, AlertType::ExpiryWarning),
            vec![
                AlertSeverity::Critical,
                AlertSeverity::Critical,
                AlertSeverity::High,
                AlertSeverity::Medium,
                AlertSeverity::Low,
            ]
        );
        assert_eq!(drafts[2].expires_at, products[2].expiry_date);
    }

    #[test]
    fn test_high_consumption_bands() {
        let policy = ThresholdPolicy::default();
        let products: Vec<Product> = (0..5).map(|_| product(100, 10)).collect();
        let reports = vec![
            report(products[0].id, 150, 10),
            report(products[1].id, 60, 10),
            report(products[2].id, 30, 10),
            report(products[3].id, 12, 10),
            report(products[4].id, 5, 10),
        ];
        let drafts = classify(&policy, &products, &reports, now());
        assert_eq!(
            severities(&drafts, AlertType::HighConsumption),
            vec![
                AlertSeverity::Critical,
                AlertSeverity::High,
                AlertSeverity::Medium,
                AlertSeverity::Low,
            ]
        );
    }

    #[test]
    fn test_underconsumption_is_not_high_consumption() {
        let policy = ThresholdPolicy::default();
        let p = product(100, 10);
        let reports = vec![report(p.id, -80, -200)];
        let drafts = classify(&policy, &[p], &reports, now());
        assert!(severities(&drafts, AlertType::HighConsumption).is_empty());
    }

    #[test]
    fn test_cost_variance() {
        let policy = ThresholdPolicy::default();
        let big = product(100, 10);
        let small = product(100, 10);
        let quiet = product(100, 10);
        let reports = vec![
            report(big.id, 60, 6_000),
            report(big.id, 40, 6_000),
            report(small.id, 5, 1_000),
            report(quiet.id, -2, -12_000),
        ];
        let drafts = classify(&policy, &[big.clone(), small, quiet.clone()], &reports, now());
        let cost: Vec<&AlertDraft> = drafts
            .iter()
            .filter(|d| d.alert_type == AlertType::CostVariance)
            .collect();
        assert_eq!(cost.len(), 2);
        assert_eq!(cost[0].product_id, big.id);
        assert_eq!(cost[0].severity, AlertSeverity::High);
        assert_eq!(cost[0].current_value, Decimal::from(12_000));
        assert_eq!(cost[1].product_id, quiet.id);
        assert_eq!(cost[1].severity, AlertSeverity::Low);
    }

    #[test]
    fn test_reports_for_unknown_products_are_skipped() {
        let reports = vec![report(Uuid::new_v4(), 500, 50_000)];
        assert!(classify(&ThresholdPolicy::default(), &[], &reports, now()).is_empty());
    }

    struct NeverAlert;

    impl ClassificationPolicy for NeverAlert {
        fn low_stock(&self, _: &Product) -> Option<Finding> {
            None
        }
        fn high_consumption(&self, _: &ProductVariance) -> Option<Finding> {
            None
        }
        fn cost_variance(&self, _: &ProductVariance) -> Option<Finding> {
            None
        }
        fn expiry(&self, _: &Product, _: NaiveDate) -> Option<Finding> {
            None
        }
    }

    #[test]
    fn test_policy_is_swappable() {
        let p = product(0, 10);
        let reports = vec![report(p.id, 500, 50_000)];
        assert!(classify(&NeverAlert, &[p], &reports, now()).is_empty());
    }
}

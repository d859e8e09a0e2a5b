//! Stock alert models and their read/dismiss lifecycle

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AlertError;

/// What an alert is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    HighConsumption,
    ExpiryWarning,
    CostVariance,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::HighConsumption => "high_consumption",
            AlertType::ExpiryWarning => "expiry_warning",
            AlertType::CostVariance => "cost_variance",
        }
    }
}

impl FromStr for AlertType {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(AlertType::LowStock),
            "high_consumption" => Ok(AlertType::HighConsumption),
            "expiry_warning" => Ok(AlertType::ExpiryWarning),
            "cost_variance" => Ok(AlertType::CostVariance),
            other => Err(AlertError::UnknownType(other.to_string())),
        }
    }
}

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(AlertError::UnknownSeverity(other.to_string())),
        }
    }
}

/// A classified finding that has not been stored yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertDraft {
    pub product_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub threshold_value: Decimal,
    pub current_value: Decimal,
    pub suggested_action: String,
    pub expires_at: Option<NaiveDate>,
}

impl AlertDraft {
    /// Materialize the draft as a fresh, unread alert
    pub fn into_alert(self, id: Uuid, created_at: DateTime<Utc>) -> StockAlert {
        StockAlert {
            id,
            product_id: self.product_id,
            alert_type: self.alert_type,
            severity: self.severity,
            title: self.title,
            message: self.message,
            threshold_value: self.threshold_value,
            current_value: self.current_value,
            suggested_action: self.suggested_action,
            is_read: false,
            is_dismissed: false,
            expires_at: self.expires_at,
            created_at,
        }
    }
}

/// A stored stock alert.
///
/// Lifecycle: unread -> read -> dismissed, or unread -> dismissed.
/// Dismissed is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub threshold_value: Decimal,
    pub current_value: Decimal,
    pub suggested_action: String,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub expires_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl StockAlert {
    /// Mark the alert as read. Reading twice is harmless.
    pub fn mark_read(&mut self) -> Result<(), AlertError> {
        if self.is_dismissed {
            return Err(AlertError::Dismissed(self.id));
        }
        self.is_read = true;
        Ok(())
    }

    /// Dismiss the alert; it leaves every listing for good
    pub fn dismiss(&mut self) -> Result<(), AlertError> {
        if self.is_dismissed {
            return Err(AlertError::Dismissed(self.id));
        }
        self.is_dismissed = true;
        Ok(())
    }

    /// Whether a listing should show this alert
    pub fn is_visible(&self, include_read: bool) -> bool {
        !self.is_dismissed && (include_read || !self.is_read)
    }
}

/// Visible alerts, most severe first, newest first within a severity
pub fn visible_alerts(alerts: &[StockAlert], include_read: bool) -> Vec<StockAlert> {
    let mut visible: Vec<StockAlert> = alerts
        .iter()
        .filter(|a| a.is_visible(include_read))
        .cloned()
        .collect();
    sort_for_listing(&mut visible);
    visible
}

/// Drafts a generation run should store.
///
/// A draft is skipped when a non-dismissed alert already covers its product
/// and type, or when an earlier draft in the same run does.
pub fn fresh_drafts(drafts: Vec<AlertDraft>, existing: &[StockAlert]) -> Vec<AlertDraft> {
    let mut covered: HashSet<(Uuid, AlertType)> = existing
        .iter()
        .filter(|a| !a.is_dismissed)
        .map(|a| (a.product_id, a.alert_type))
        .collect();
    drafts
        .into_iter()
        .filter(|d| covered.insert((d.product_id, d.alert_type)))
        .collect()
}

/// Order alerts by severity descending, then creation time descending
pub fn sort_for_listing(alerts: &mut [StockAlert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

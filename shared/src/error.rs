//! Engine error types

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failures while producing a consumption report.
///
/// Reports are durable financial records, so every referenced entity must exist.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("Appointment {0} not found")]
    UnknownAppointment(Uuid),

    #[error("Treatment {0} not found")]
    UnknownTreatment(Uuid),

    #[error("Product {0} not found")]
    UnknownProduct(Uuid),

    #[error("{field} cannot be negative")]
    NegativeQuantity { field: &'static str },

    #[error("{field}: {reason}")]
    InvalidQuantity {
        field: &'static str,
        reason: &'static str,
    },
}

/// Failures of the inverse pricing computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Target margin {target}% is outside the allowed range {min}%-{max}%")]
    TargetMarginOutOfRange {
        target: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Cost cannot be negative")]
    NegativeCost,

    #[error("Cost {cost} is too large to price")]
    PriceOverflow { cost: Decimal },
}

/// Optimistic concurrency failures on catalog edits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Stale version {expected}, the stored version is {current}")]
    StaleVersion { expected: i32, current: i32 },
}

/// Alert lifecycle and decoding failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Alert {0} has been dismissed")]
    Dismissed(Uuid),

    #[error("Unknown alert type: {0}")]
    UnknownType(String),

    #[error("Unknown alert severity: {0}")]
    UnknownSeverity(String),
}

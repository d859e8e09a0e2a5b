//! Cost and pricing reconciliation engine for the clinic platform
//!
//! Pure computations over catalog snapshots, shared between the backend and
//! the browser (via WASM):
//! - consumable roll-up for treatments and packages
//! - cost, margin and recommended price
//! - expected versus recorded consumption variance
//! - stock alert classification and lifecycle

pub mod aggregation;
pub mod alerts;
pub mod error;
pub mod export;
pub mod margin;
pub mod models;
pub mod types;
pub mod validation;
pub mod variance;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;

//! Domain models for the clinic cost and pricing engine

mod alert;
mod catalog;
mod consumption;
mod pricing;

pub use alert::*;
pub use catalog::*;
pub use consumption::*;
pub use pricing::*;

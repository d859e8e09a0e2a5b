//! Business logic services for the clinic pricing platform

pub mod alerts;
pub mod catalog;
pub mod consumption;
pub mod pricing;

pub use alerts::AlertService;
pub use catalog::CatalogService;
pub use consumption::ConsumptionService;
pub use pricing::PricingService;

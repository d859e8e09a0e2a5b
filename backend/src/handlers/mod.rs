//! HTTP handlers for the clinic pricing API

pub mod alerts;
pub mod catalog;
pub mod consumption;
pub mod health;
pub mod pricing;

pub use alerts::*;
pub use catalog::*;
pub use consumption::*;
pub use health::*;
pub use pricing::*;

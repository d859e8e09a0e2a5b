//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Row limit for report listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListLimit(pub u32);

impl ListLimit {
    pub const DEFAULT: u32 = 100;
    pub const MAX: u32 = 1000;

    /// Clamp a requested limit into 1..=MAX, defaulting when absent
    pub fn from_request(requested: Option<u32>) -> Self {
        let limit = requested.unwrap_or(Self::DEFAULT).clamp(1, Self::MAX);
        Self(limit)
    }

    pub fn as_i64(&self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for ListLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

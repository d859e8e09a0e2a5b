//! Configuration management for the clinic pricing server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CLINIC_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::alerts::ThresholdPolicy;
use shared::margin::PricingPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Target margin bounds for price recommendations
    #[serde(default)]
    pub pricing: PricingPolicy,

    /// Alert generation settings
    #[serde(default)]
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Requests taking longer than this are aborted
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    /// Classification bands, see `shared::alerts`
    pub thresholds: ThresholdPolicy,

    /// Number of most recent consumption reports a generation run scans
    pub recent_report_limit: u32,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdPolicy::default(),
            recent_report_limit: 200,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CLINIC_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CLINIC_ prefix)
            .add_source(
                Environment::with_prefix("CLINIC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pricing.min_target_margin > self.pricing.max_target_margin {
            return Err(ConfigError::Message(
                "pricing.min_target_margin must not exceed pricing.max_target_margin".into(),
            ));
        }
        if self.pricing.max_target_margin >= rust_decimal::Decimal::ONE_HUNDRED {
            return Err(ConfigError::Message(
                "pricing.max_target_margin must be below 100".into(),
            ));
        }
        if self.pricing.check_target(self.pricing.default_target_margin).is_err() {
            return Err(ConfigError::Message(
                "pricing.default_target_margin must lie within the target margin range".into(),
            ));
        }
        if self.alerts.recent_report_limit == 0 {
            return Err(ConfigError::Message(
                "alerts.recent_report_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

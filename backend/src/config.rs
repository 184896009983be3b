//! Configuration management for the Caja POS backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with POS_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{BusinessCalendar, Money};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Business rules that vary per installation
    pub business: BusinessConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
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
pub struct JwtConfig {
    /// Secret key used to verify bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessConfig {
    /// Offset of the business-local calendar from UTC
    pub utc_offset_minutes: i32,

    /// Per-unit fixed cost for products without sales in the period.
    /// Unset means such products need manual input.
    pub zero_sales_fixed_cost_fallback: Option<Decimal>,

    /// Baseline for custom apportionment periods
    pub working_days_per_month: u32,

    /// Retries of a credit payment after a deadlock or serialization failure
    pub max_conflict_retries: u32,

    /// Profit margin applied to new products without one
    pub default_profit_margin: Decimal,
}

impl BusinessConfig {
    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(self.utc_offset_minutes).unwrap_or_default()
    }

    pub fn zero_sales_fallback(&self) -> Option<Money> {
        self.zero_sales_fixed_cost_fallback.map(Money::new)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("POS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("business.utc_offset_minutes", -300)?
            .set_default("business.zero_sales_fixed_cost_fallback", "500.00")?
            .set_default("business.working_days_per_month", 22)?
            .set_default("business.max_conflict_retries", 3)?
            .set_default("business.default_profit_margin", "30")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (POS_ prefix)
            .add_source(
                Environment::with_prefix("POS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        BusinessCalendar::new(config.business.utc_offset_minutes)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(config)
    }
}


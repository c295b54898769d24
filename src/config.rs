use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Sales policy configuration.
///
/// These thresholds drive the approval policy: orders created by
/// employee-level actors route to a manager when a line discount exceeds
/// `max_employee_discount_percent`, or when items source from more than one
/// location while `cross_location_requires_approval` is set.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SalesConfig {
    /// Kill switch for the whole sales workflow.
    #[serde(default = "default_sales_enabled")]
    pub enabled: bool,

    /// Largest discount (percent) an employee may apply without approval.
    #[serde(default = "default_max_employee_discount")]
    #[validate(custom = "validate_percent")]
    pub max_employee_discount_percent: Decimal,

    /// Whether employee orders sourcing from multiple locations need approval.
    #[serde(default = "default_cross_location_requires_approval")]
    pub cross_location_requires_approval: bool,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            enabled: default_sales_enabled(),
            max_employee_discount_percent: default_max_employee_discount(),
            cross_location_requires_approval: default_cross_location_requires_approval(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub sales: SalesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            sales: SalesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `config/{environment}` files with environment
    /// variable overrides (prefix `STOCKLINE`, `__` separator).
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCKLINE_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
            .add_source(Environment::with_prefix("STOCKLINE").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

        Ok(app_config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn default_sales_enabled() -> bool {
    true
}

fn default_max_employee_discount() -> Decimal {
    dec!(10)
}

fn default_cross_location_requires_approval() -> bool {
    true
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn validate_percent(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > dec!(100) {
        return Err(ValidationError::new("percent_out_of_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.sales.enabled);
        assert_eq!(config.sales.max_employee_discount_percent, dec!(10));
        assert!(config.sales.cross_location_requires_approval);
    }

    #[test]
    fn rejects_out_of_range_discount() {
        let mut config = AppConfig::default();
        config.sales.max_employee_discount_percent = dec!(101);
        assert!(config.validate().is_err());
    }
}

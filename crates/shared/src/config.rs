//! Application configuration management.

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::AppError;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Budget planner configuration.
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Budget planner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// IANA time zone used for calendar-day arithmetic.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Months of spending history used for proportional allocation.
    #[serde(default = "default_history_months")]
    pub history_months: u32,
    /// Label appended to rendered amounts.
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            history_months: default_history_months(),
            currency_label: default_currency_label(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Ho_Chi_Minh".to_string()
}

fn default_history_months() -> u32 {
    3
}

fn default_currency_label() -> String {
    "VND".to_string()
}

impl PlannerConfig {
    /// Resolves the configured time zone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the name is not a known IANA zone.
    pub fn time_zone(&self) -> Result<Tz, AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Configuration(format!("unknown time zone: {}", self.timezone)))
    }

    /// Checks the planner section for values the planner cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` for an unknown time zone or a zero
    /// history window.
    pub fn validate(&self) -> Result<(), AppError> {
        self.time_zone()?;
        if self.history_months == 0 {
            return Err(AppError::Configuration(
                "planner.history_months must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MYMONEY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_defaults() {
        let planner = PlannerConfig::default();
        assert_eq!(planner.timezone, "Asia/Ho_Chi_Minh");
        assert_eq!(planner.history_months, 3);
        assert_eq!(planner.currency_label, "VND");
        assert!(planner.validate().is_ok());
    }

    #[test]
    fn test_unknown_time_zone_rejected() {
        let planner = PlannerConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..PlannerConfig::default()
        };
        assert!(matches!(
            planner.validate(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_history_rejected() {
        let planner = PlannerConfig {
            history_months: 0,
            ..PlannerConfig::default()
        };
        assert!(matches!(
            planner.validate(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("MYMONEY__DATABASE__URL", Some("sqlite::memory:")),
                ("MYMONEY__PLANNER__TIMEZONE", Some("UTC")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.database.url, "sqlite::memory:");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.planner.timezone, "UTC");
                assert_eq!(config.planner.history_months, 3);
            },
        );
    }
}

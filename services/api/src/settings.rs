//! HTTP server settings

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Longest loan period accepted, ten years
pub const MAX_LOAN_PERIOD_DAYS: i64 = 3650;

/// Server settings, read from `LIBRARY_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Days until a new loan is due
    pub loan_period_days: i64,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config: ServerConfig = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("loan_period_days", 14)?
            .add_source(Environment::with_prefix("LIBRARY").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.loan_period_days <= 0 {
            return Err(ConfigError::Message(
                "LIBRARY_LOAN_PERIOD_DAYS must be positive".to_string(),
            ));
        }
        if config.loan_period_days > MAX_LOAN_PERIOD_DAYS {
            return Err(ConfigError::Message(format!(
                "LIBRARY_LOAN_PERIOD_DAYS cannot exceed {}",
                MAX_LOAN_PERIOD_DAYS
            )));
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn loan_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.loan_period_days)
    }
}

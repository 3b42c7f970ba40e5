//! Application configuration

use crate::error::{Result, UtilsError};
use crate::logging::{LogFormat, init_tracing_with};
use serde::{Deserialize, Serialize};

/// Application-level settings shared by the binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, etc.)
    pub environment: String,
    /// Default `EnvFilter` directives when `RUST_LOG` is unset
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "hedge".to_string(),
            environment: "development".to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::Plain,
        }
    }
}

impl AppConfig {
    /// Read `HEDGE_ENV`, `HEDGE_LOG` and `HEDGE_LOG_FORMAT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(environment) = value("HEDGE_ENV") {
            config.environment = environment.trim().to_string();
        }
        if let Some(filter) = value("HEDGE_LOG") {
            config.log_filter = filter;
        }
        if let Some(format) = value("HEDGE_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    /// Install the global tracing subscriber from these settings
    pub fn init_logging(&self) -> Result<()> {
        if self.log_filter.trim().is_empty() {
            return Err(UtilsError::Config("log filter must not be empty".to_string()));
        }
        init_tracing_with(&self.log_filter, self.log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!config.is_production());
    }

    #[test]
    fn test_reads_environment() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HEDGE_ENV", "production"),
            ("HEDGE_LOG", "warn,hedge_client=debug"),
            ("HEDGE_LOG_FORMAT", "JSON"),
        ]))
        .unwrap()
        .with_app_name("hedge-cli");

        assert!(config.is_production());
        assert_eq!(config.log_filter, "warn,hedge_client=debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.app_name, "hedge-cli");
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("HEDGE_LOG", "  ")])).unwrap();
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_bad_log_format() {
        let result = AppConfig::from_lookup(lookup(&[("HEDGE_LOG_FORMAT", "xml")]));
        assert!(matches!(result, Err(UtilsError::Config(_))));
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        let config = AppConfig {
            log_filter: String::new(),
            ..AppConfig::default()
        };
        assert!(config.init_logging().is_err());
    }
}

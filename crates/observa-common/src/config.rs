//! Configuration management for Observa components

use observa_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Import/reconciliation settings
    #[serde(default)]
    pub import: ImportConfig,

    /// Notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Merge with environment variables (OBSERVA_ prefix)
    pub fn merge_env(mut self) -> Self {
        if let Ok(val) = std::env::var("OBSERVA_RISK_ACCEPTANCE_EXPIRY_DAYS") {
            if let Ok(days) = val.parse() {
                self.import.risk_acceptance_expiry_days = days;
            }
        }
        if let Ok(val) = std::env::var("OBSERVA_NOTIFICATION_COOLDOWN_SECONDS") {
            if let Ok(seconds) = val.parse() {
                self.notifications.cooldown_seconds = seconds;
            }
        }
        if let Ok(val) = std::env::var("OBSERVA_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("OBSERVA_LOG_FORMAT") {
            self.logging.format = val;
        }
        self
    }
}

/// Import/reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Default days until an accepted risk expires, used for products
    /// without their own setting; 0 disables expiry
    #[serde(default = "default_expiry_days")]
    pub risk_acceptance_expiry_days: u32,

    /// Whether new products apply general rules by default
    #[serde(default = "default_true")]
    pub apply_general_rules: bool,
}

fn default_expiry_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            risk_acceptance_expiry_days: 30,
            apply_general_rules: true,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Minimum seconds between repeated notifications for the same key
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,
}

fn default_cooldown() -> u64 {
    3600
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 3600,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("pretty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [import]
            risk_acceptance_expiry_days = 90

            [notifications]
            cooldown_seconds = 600

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.import.risk_acceptance_expiry_days, 90);
        assert_eq!(config.notifications.cooldown_seconds, 600);
        assert_eq!(config.logging.level, "debug");
        assert!(config.import.apply_general_rules);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.import.risk_acceptance_expiry_days, 30);
        assert_eq!(config.notifications.cooldown_seconds, 3600);
        assert_eq!(config.logging.level, "info");
    }
}

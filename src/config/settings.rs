//! Application settings loaded from `config.toml`.
//!
//! Every key has a default so a missing file is not an error. `DATABASE_URL` in the
//! environment (or `.env`) overrides the file.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default look-ahead window for expiry alerts, in days.
pub const DEFAULT_EXPIRY_ALERT_DAYS: i64 = 90;

/// Settings for the ledger service
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Connection string understood by `sea_orm::Database::connect`
    pub database_url: String,
    /// Batches expiring within this many days are reported as expiring soon
    pub expiry_alert_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
        }
    }
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.expiry_alert_days < 0 {
        return Err(Error::Config {
            message: format!(
                "expiry_alert_days must not be negative, got {}",
                config.expiry_alert_days
            ),
        });
    }
    Ok(config)
}

/// Loads settings from a TOML file, falling back to defaults when it does not exist.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(?path, "No config file found, using defaults");
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from `PHARMACY_CONFIG` (default `./config.toml`) and applies
/// the `DATABASE_URL` override.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("PHARMACY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = load_config(&path)?;

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database_url = url;
    }
    Ok(config)
}

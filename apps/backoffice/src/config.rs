//! # Application Configuration
//!
//! Read once at startup, read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`COLDROOM_*`)
//! 2. Defaults (this file)
//!
//! | Variable                   | Default                      |
//! |----------------------------|------------------------------|
//! | `COLDROOM_DB_PATH`         | platform data dir / coldroom.db |
//! | `COLDROOM_STORE_NAME`      | `Coldroom Store`             |
//! | `COLDROOM_VAT_RATE`        | `15` (percent)               |
//! | `COLDROOM_LOCK_TIMEOUT_MS` | `5000`                       |
//! | `COLDROOM_CURRENCY_SYMBOL` | `₵`                          |

use std::path::PathBuf;
use std::time::Duration;

use coldroom_core::{Money, TaxRate, DEFAULT_VAT_RATE};
use directories::ProjectDirs;
use serde::Serialize;
use thiserror::Error;

/// Invalid or unusable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Could not determine an app data directory; set COLDROOM_DB_PATH")]
    NoDataDir,

    #[error("Could not create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Store name (printed on receipts).
    pub store_name: String,

    /// VAT applied to sales created with `--vat`.
    pub vat_rate: TaxRate,

    /// Longest wait for another sale's product lock.
    pub lock_timeout: Duration,

    /// Currency symbol for display.
    pub currency_symbol: String,
}

impl AppConfig {
    /// Defaults for a given database path.
    pub fn with_database(database_path: impl Into<PathBuf>) -> Self {
        AppConfig {
            database_path: database_path.into(),
            store_name: "Coldroom Store".to_string(),
            vat_rate: DEFAULT_VAT_RATE,
            lock_timeout: Duration::from_secs(5),
            currency_symbol: "₵".to_string(),
        }
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_path = match lookup("COLDROOM_DB_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };
        let mut config = AppConfig::with_database(database_path);

        if let Some(name) = lookup("COLDROOM_STORE_NAME").filter(|n| !n.trim().is_empty()) {
            config.store_name = name.trim().to_string();
        }

        if let Some(rate) = lookup("COLDROOM_VAT_RATE") {
            config.vat_rate = rate.parse().map_err(|e: coldroom_core::ValidationError| {
                ConfigError::Invalid {
                    var: "COLDROOM_VAT_RATE",
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(ms) = lookup("COLDROOM_LOCK_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "COLDROOM_LOCK_TIMEOUT_MS",
                reason: format!("'{ms}' is not a number of milliseconds"),
            })?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    var: "COLDROOM_LOCK_TIMEOUT_MS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.lock_timeout = Duration::from_millis(ms);
        }

        if let Some(symbol) = lookup("COLDROOM_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol.trim().to_string();
        }

        Ok(config)
    }

    /// Formats an amount with the currency symbol.
    ///
    /// ## Example
    /// ```rust,ignore
    /// assert_eq!(config.format_money(Money::from_cents(1234)), "₵12.34");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{}{}", self.currency_symbol, Money::from_cents(-amount.cents()))
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }
}

/// Platform data directory.
///
/// - **macOS**: `~/Library/Application Support/com.coldroom.pos/coldroom.db`
/// - **Windows**: `%APPDATA%\coldroom\pos\data\coldroom.db`
/// - **Linux**: `~/.local/share/pos/coldroom.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "coldroom", "pos").ok_or(ConfigError::NoDataDir)?;
    let data_dir = dirs.data_dir();

    std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::DataDir {
        path: data_dir.to_path_buf(),
        source,
    })?;

    Ok(data_dir.join("coldroom.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("COLDROOM_DB_PATH", "/tmp/store.db"),
            ("COLDROOM_STORE_NAME", "Tema Cold Store"),
            ("COLDROOM_VAT_RATE", "12.5"),
            ("COLDROOM_LOCK_TIMEOUT_MS", "250"),
            ("COLDROOM_CURRENCY_SYMBOL", "GH₵"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/store.db"));
        assert_eq!(config.store_name, "Tema Cold Store");
        assert_eq!(config.vat_rate, TaxRate::from_bps(1250));
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.format_money(Money::from_cents(1234)), "GH₵12.34");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("COLDROOM_DB_PATH", "/tmp/store.db")])).unwrap();
        assert_eq!(config.vat_rate, DEFAULT_VAT_RATE);
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert_eq!(config.format_money(Money::from_cents(-50)), "-₵0.50");
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[
            ("COLDROOM_DB_PATH", "/tmp/store.db"),
            ("COLDROOM_VAT_RATE", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "COLDROOM_VAT_RATE", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("COLDROOM_DB_PATH", "/tmp/store.db"),
            ("COLDROOM_LOCK_TIMEOUT_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "COLDROOM_LOCK_TIMEOUT_MS", .. }));
    }
}

//! Configuration loading and representation.
//!
//! All settings come from environment variables with sensible defaults, so
//! running `stockbook` with an empty environment works out of the box.

use thiserror::Error;

use stockbook_inventory::LowStockThreshold;
use stockbook_observability::{LogFormat, TracingConfig};

use crate::ledger::{DEFAULT_RECENT_HISTORY_LIMIT, LedgerSettings};
use crate::store::DEFAULT_HISTORY_LIMIT;

pub const DATABASE_URL: &str = "STOCKBOOK_DATABASE_URL";
pub const MAX_CONNECTIONS: &str = "STOCKBOOK_MAX_CONNECTIONS";
pub const LOW_STOCK_THRESHOLD: &str = "STOCKBOOK_LOW_STOCK_THRESHOLD";
pub const HISTORY_LIMIT: &str = "STOCKBOOK_HISTORY_LIMIT";
pub const RECENT_HISTORY_LIMIT: &str = "STOCKBOOK_RECENT_HISTORY_LIMIT";
pub const LOG_FORMAT: &str = "STOCKBOOK_LOG_FORMAT";
pub const RUST_LOG: &str = "RUST_LOG";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://stockbook.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockbookConfig {
    pub database_url: String,
    /// Already clamped to 1 for in-memory databases.
    pub max_connections: u32,
    pub ledger: LedgerSettings,
    pub log_format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for StockbookConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            ledger: LedgerSettings::default(),
            log_format: LogFormat::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StockbookConfig {
    pub fn tracing(&self) -> TracingConfig {
        TracingConfig {
            default_filter: self.log_filter.clone(),
            format: self.log_format,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup(DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let max_connections = match parse(&lookup, MAX_CONNECTIONS)? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: MAX_CONNECTIONS,
                    value: "0".to_string(),
                });
            }
            Some(n) => n,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let ledger = LedgerSettings {
            low_stock_threshold: parse(&lookup, LOW_STOCK_THRESHOLD)?
                .map(LowStockThreshold::new)
                .unwrap_or_default(),
            history_limit: parse(&lookup, HISTORY_LIMIT)?.unwrap_or(DEFAULT_HISTORY_LIMIT),
            recent_history_limit: parse(&lookup, RECENT_HISTORY_LIMIT)?
                .unwrap_or(DEFAULT_RECENT_HISTORY_LIMIT),
        };

        let log_format = match lookup(LOG_FORMAT) {
            Some(raw) => raw.parse::<LogFormat>().map_err(|_| ConfigError::Invalid {
                key: LOG_FORMAT,
                value: raw,
            })?,
            None => LogFormat::default(),
        };

        let log_filter = lookup(RUST_LOG)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            database_url,
            max_connections,
            ledger,
            log_format,
            log_filter,
        })
    }
}

fn parse<F>(lookup: &F, key: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid { key, value: raw })
        })
        .transpose()
}

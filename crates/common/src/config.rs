use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_BACKEND_URL: &str = "https://algo-backend-ld5h.onrender.com";
const DEFAULT_DATABASE_URL: &str = "sqlite://algoblok.db?mode=rwc";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Process configuration loaded from environment variables at startup.
/// Every variable is optional; malformed values are reported, not defaulted.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backtest/optimization backend.
    pub backend_url: String,
    /// SQLite URL of the saved strategy/script library.
    pub database_url: String,
    /// Upper bound for a single backend request.
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let request_timeout_secs = match optional_env("ALGOBLOK_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "ALGOBLOK_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got: '{raw}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Config {
            backend_url: optional_env("ALGOBLOK_BACKEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            database_url: optional_env("ALGOBLOK_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            request_timeout_secs,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Market and date range a backtest or optimization runs over.
///
/// Example `run.toml`:
/// ```toml
/// symbol = "BTC/USDT"
/// timeframe = "4h"
/// start_date = "2023-01-01"
/// end_date = "2023-12-31"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: String,
    pub end_date: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: "1h".to_string(),
            start_date: "2023-01-01".to_string(),
            end_date: "2023-12-31".to_string(),
        }
    }
}

impl RunSettings {
    /// Load from a TOML file. Missing keys fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

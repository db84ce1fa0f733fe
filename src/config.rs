//! Runtime configuration loaded from the environment (`setting.env` / `.env`).

use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_MARKETPLACE_API_BASE_URL: &str = "https://sls.g2g.com";
pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_key: String,
    pub sheet_name: String,
    pub sheets_access_token: Option<String>,
    pub sheets_api_base_url: String,
    pub marketplace_token: Option<String>,
    pub marketplace_api_base_url: String,
    pub relax_time_each_round: Duration,
    pub retry_max_attempts: usize,
    pub retry_delay: Duration,
    pub log_level: String,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; `from_env` is the production caller.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| SyncError::Config(format!("{} is not set", key)))
        };

        Ok(Self {
            spreadsheet_key: required("SPREADSHEET_KEY")?,
            sheet_name: required("SHEET_NAME")?,
            sheets_access_token: get("SHEETS_ACCESS_TOKEN"),
            sheets_api_base_url: get("SHEETS_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE_URL.to_string()),
            marketplace_token: get("MARKETPLACE_TOKEN"),
            marketplace_api_base_url: get("MARKETPLACE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MARKETPLACE_API_BASE_URL.to_string()),
            relax_time_each_round: Duration::from_secs(parse_or(
                get("RELAX_TIME_EACH_ROUND"),
                "RELAX_TIME_EACH_ROUND",
                60,
            )?),
            retry_max_attempts: parse_or(get("RETRY_MAX_ATTEMPTS"), "RETRY_MAX_ATTEMPTS", 3)?,
            retry_delay: Duration::from_secs(parse_or(
                get("RETRY_DELAY_SECS"),
                "RETRY_DELAY_SECS",
                30,
            )?),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Retry policy applied to spreadsheet writes.
    pub fn sheet_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, self.retry_delay)
    }

    /// Retry policy applied to marketplace API calls.
    pub fn api_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, Duration::from_secs(5).min(self.retry_delay))
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SyncError::Config(format!("{} has an invalid value: {}", key, raw))),
    }
}

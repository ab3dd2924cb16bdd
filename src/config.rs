//! Configuration management for the site monitor

use crate::errors::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ALERT_RECIPIENT: &str = "admin@example.com";
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_COLLECTION_WINDOW_MS: u64 = 5000;
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Ordered list of URLs to probe every round
    pub websites: Vec<String>,

    /// Seconds to sleep between rounds
    pub interval: u64,

    /// Attempts per probe before a target is considered down
    pub max_retries: u32,

    /// Latency threshold in milliseconds above which a success is "slow"
    pub response_time_max: u64,

    /// Address that receives slow and down alerts
    #[serde(default = "default_alert_recipient")]
    pub alert_recipient: String,

    /// Fixed wait between failed attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Grace period between launching the probes and scanning the results
    #[serde(default = "default_collection_window_ms")]
    pub collection_window_ms: u64,

    /// Per-request timeout. Absent means the HTTP client default (none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

fn default_alert_recipient() -> String {
    DEFAULT_ALERT_RECIPIENT.to_string()
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_collection_window_ms() -> u64 {
    DEFAULT_COLLECTION_WINDOW_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            websites: Vec::new(),
            interval: 60,
            max_retries: 3,
            response_time_max: 1000,
            alert_recipient: default_alert_recipient(),
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            collection_window_ms: DEFAULT_COLLECTION_WINDOW_MS,
            request_timeout_ms: None,
        }
    }
}

impl Config {
    /// Parse a configuration document
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `MONITOR_*` environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("MONITOR_INTERVAL") {
            if let Ok(seconds) = interval.parse() {
                self.interval = seconds;
            }
        }

        if let Some(max_retries) = lookup("MONITOR_MAX_RETRIES") {
            if let Ok(retries) = max_retries.parse() {
                self.max_retries = retries;
            }
        }

        if let Some(threshold) = lookup("MONITOR_RESPONSE_TIME_MAX_MS") {
            if let Ok(ms) = threshold.parse() {
                self.response_time_max = ms;
            }
        }

        if let Some(recipient) = lookup("MONITOR_ALERT_RECIPIENT") {
            if !recipient.trim().is_empty() {
                self.alert_recipient = recipient.trim().to_string();
            }
        }

        if let Some(timeout) = lookup("MONITOR_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.request_timeout_ms = Some(ms);
            }
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.websites.is_empty() {
            return Err("at least one website must be specified".to_string());
        }

        if let Some(index) = self.websites.iter().position(|url| url.trim().is_empty()) {
            return Err(format!("website #{} has an empty URL", index + 1));
        }

        if self.interval == 0 {
            return Err("interval must be greater than 0".to_string());
        }

        if self.max_retries == 0 {
            return Err("maxRetries must be greater than 0".to_string());
        }

        if self.collection_window_ms == 0 {
            return Err("collectionWindowMs must be greater than 0".to_string());
        }

        if self.alert_recipient.trim().is_empty() {
            return Err("alertRecipient cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn round_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.response_time_max)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn collection_window(&self) -> Duration {
        Duration::from_millis(self.collection_window_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Source of the monitoring configuration
pub trait ConfigLoader {
    fn load(&self) -> Result<Config>;
}

/// Loads the configuration from a JSON file, then applies environment overrides
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigLoader for JsonFileLoader {
    fn load(&self) -> Result<Config> {
        let raw = std::fs::read_to_string(&self.path)?;
        let config = Config::from_json(&raw)?.with_env_overrides();
        config.validate().map_err(MonitorError::Config)?;
        Ok(config)
    }
}

/// Mail relay settings, read from the environment
#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    /// Sender address, also the SMTP user name
    pub from: String,
    pub password: String,
    /// No host means alerts only go to the log
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            from: lookup("EMAIL_FROM").unwrap_or_default(),
            password: lookup("EMAIL_PASSWORD").unwrap_or_default(),
            smtp_host: lookup("SMTP_HOST").filter(|host| !host.trim().is_empty()),
            smtp_port: lookup("SMTP_PORT")
                .and_then(|port| port.trim().parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
        }
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::sync::engine::DEFAULT_MAX_DEPTH;

pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net";
const DEFAULT_UPLOAD_CONCURRENCY: u64 = 4;
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 60 * 60;
const DEFAULT_TRANSFER_IDLE_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    NotPositive { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct DaemonConfig {
    pub token: String,
    pub local_root: PathBuf,
    pub remote_root: String,
    pub sync_period: Duration,
    pub api_url: String,
    pub api_timeout: Duration,
    pub upload_concurrency: usize,
    pub transfer_timeout: Duration,
    pub transfer_idle_timeout: Duration,
    pub max_depth: usize,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = dirs::home_dir();
        let expand = |value: String| match &home {
            Some(home) => expand_with_home(&value, home),
            None => PathBuf::from(value),
        };
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let positive = |name: &'static str, default: Option<u64>| -> Result<u64, ConfigError> {
            match (lookup(name), default) {
                (Some(value), _) => parse_positive(name, &value),
                (None, Some(default)) => Ok(default),
                (None, None) => Err(ConfigError::Missing(name)),
            }
        };

        Ok(Self {
            token: required("YADISK_TOKEN")?,
            local_root: expand(required("YAMIRROR_LOCAL_DIR")?),
            remote_root: required("YAMIRROR_REMOTE_DIR")?,
            sync_period: Duration::from_secs(positive("YAMIRROR_SYNC_PERIOD_SECS", None)?),
            api_url: lookup("YAMIRROR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_timeout: Duration::from_secs(positive(
                "YAMIRROR_API_TIMEOUT_SECS",
                Some(DEFAULT_API_TIMEOUT_SECS),
            )?),
            upload_concurrency: positive(
                "YAMIRROR_UPLOAD_CONCURRENCY",
                Some(DEFAULT_UPLOAD_CONCURRENCY),
            )? as usize,
            transfer_timeout: Duration::from_secs(positive(
                "YAMIRROR_TRANSFER_TIMEOUT_SECS",
                Some(DEFAULT_TRANSFER_TIMEOUT_SECS),
            )?),
            transfer_idle_timeout: Duration::from_secs(positive(
                "YAMIRROR_TRANSFER_IDLE_SECS",
                Some(DEFAULT_TRANSFER_IDLE_SECS),
            )?),
            max_depth: positive("YAMIRROR_MAX_DEPTH", Some(DEFAULT_MAX_DEPTH as u64))? as usize,
            log_dir: lookup("YAMIRROR_LOG_DIR")
                .filter(|value| !value.trim().is_empty())
                .map(expand),
        })
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or_else(|| ConfigError::NotPositive {
            name,
            value: value.to_string(),
        })
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

//! Runtime configuration for blog hosts.
//!
//! Settings come from `VESBLOG_*` environment variables. Parsing goes through
//! a lookup function so hosts and tests can supply their own source.

use crate::logging::{default_log_level, normalize_level};
use crate::store::StaticStoreManager;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "VESBLOG_DB_PATH";
pub const ENV_BASE_URL: &str = "VESBLOG_BASE_URL";
pub const ENV_STORE_ID: &str = "VESBLOG_STORE_ID";
pub const ENV_LOG_LEVEL: &str = "VESBLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "VESBLOG_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "vesblog.sqlite3";
const DEFAULT_BASE_URL: &str = "http://localhost/";
const DEFAULT_STORE_ID: i64 = 1;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.variable, self.message)
    }
}

impl Error for ConfigError {}

/// Resolved blog settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogConfig {
    pub db_path: PathBuf,
    pub store_id: i64,
    /// Normalized to end with `/`.
    pub base_url: String,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl BlogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));

        let store_id = match read(ENV_STORE_ID) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) if value >= 0 => value,
                _ => {
                    return Err(ConfigError {
                        variable: ENV_STORE_ID,
                        message: format!("expected a non-negative integer, got `{raw}`"),
                    })
                }
            },
            None => DEFAULT_STORE_ID,
        };

        let base_url = normalize_base_url(
            read(ENV_BASE_URL)
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL),
        )?;

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(raw) => normalize_level(&raw).map_err(|err| ConfigError {
                variable: ENV_LOG_LEVEL,
                message: err.to_string(),
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(ENV_LOG_DIR).map(PathBuf::from) {
            Some(dir) if !dir.is_absolute() => {
                return Err(ConfigError {
                    variable: ENV_LOG_DIR,
                    message: format!("`{}` is not an absolute path", dir.display()),
                })
            }
            other => other,
        };

        Ok(Self {
            db_path,
            store_id,
            base_url,
            log_level,
            log_dir,
        })
    }

    pub fn store_manager(&self) -> StaticStoreManager {
        StaticStoreManager::new(self.store_id, self.base_url.clone())
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let has_scheme = raw.starts_with("http://") || raw.starts_with("https://");
    let has_host = raw
        .split_once("://")
        .map(|(_, rest)| !rest.trim_start_matches('/').is_empty())
        .unwrap_or(false);
    if !has_scheme || !has_host {
        return Err(ConfigError {
            variable: ENV_BASE_URL,
            message: format!("expected an http(s) URL, got `{raw}`"),
        });
    }

    let mut url = raw.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    Ok(url)
}

//! Core configuration.
//!
//! # Responsibility
//! - Collect storage and logging settings from `MEETSCHED_*` variables.
//! - Reject unusable values before any connection is opened.
//!
//! # Invariants
//! - A validated config always yields a pool of at least one connection and
//!   a non-zero store timeout.

use crate::db::PoolOptions;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "MEETSCHED_DB_PATH";
pub const ENV_POOL_SIZE: &str = "MEETSCHED_POOL_SIZE";
pub const ENV_STORE_TIMEOUT_MS: &str = "MEETSCHED_STORE_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "MEETSCHED_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MEETSCHED_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "meetsched.sqlite3";
const DEFAULT_POOL_SIZE: usize = 4;
const MAX_POOL_SIZE: usize = 64;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key} value `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Settings needed to bring the core up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub pool_size: usize,
    /// Bound for every storage wait: pool checkout and SQLite locks.
    pub store_timeout: Duration,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            pool_size: DEFAULT_POOL_SIZE,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = non_blank(lookup(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = non_blank(lookup(ENV_POOL_SIZE)) {
            config.pool_size = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_POOL_SIZE,
                value: value.clone(),
                reason: "expected a positive integer".to_string(),
            })?;
        }
        if let Some(value) = non_blank(lookup(ENV_STORE_TIMEOUT_MS)) {
            let millis: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_STORE_TIMEOUT_MS,
                value: value.clone(),
                reason: "expected milliseconds as an integer".to_string(),
            })?;
            config.store_timeout = Duration::from_millis(millis);
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = value;
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_DIR)) {
            config.log_dir = Some(PathBuf::from(value));
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and formats without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::InvalidValue {
                key: ENV_POOL_SIZE,
                value: self.pool_size.to_string(),
                reason: format!("must be between 1 and {MAX_POOL_SIZE}"),
            });
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: ENV_STORE_TIMEOUT_MS,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::InvalidValue {
            key: ENV_LOG_LEVEL,
            value: self.log_level.clone(),
            reason: err.to_string(),
        })?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    value: dir.display().to_string(),
                    reason: "must be an absolute path".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            size: self.pool_size,
            store_timeout: self.store_timeout,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

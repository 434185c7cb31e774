//! Process configuration for hosts embedding the registry.
//!
//! # Responsibility
//! - Read database location and logging settings from the environment
//!   (optionally seeded from a `.env` file).
//!
//! # Invariants
//! - Configuration is validated once at load time; hosts never see a
//!   relative log directory or an unknown log level.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "ABSENCE_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "ABSENCE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "ABSENCE_LOG_DIR";

/// Settings for opening storage and starting logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file; `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = non_empty(DB_PATH_VAR).map(|value| PathBuf::from(value.trim()));

        let log_level = match non_empty(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value)
                .map_err(|err| ConfigError::InvalidLogLevel(err.to_string()))?,
            None => default_log_level(),
        };

        let log_dir = non_empty(LOG_DIR_VAR)
            .map(|value| {
                normalize_log_dir(&value).map_err(|err| ConfigError::InvalidLogDir(err.to_string()))
            })
            .transpose()?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    InvalidLogDir(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLogLevel(message) => write!(f, "{LOG_LEVEL_VAR}: {message}"),
            ConfigError::InvalidLogDir(message) => write!(f, "{LOG_DIR_VAR}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

//! Environment-driven configuration for the API facade.
//!
//! # Invariants
//! - Blank environment values count as unset.
//! - Without `PUBLISH_LOG_DIR`, file logging stays off.

use publish_core::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "PUBLISH_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "PUBLISH_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PUBLISH_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "publish_articles.sqlite3";

/// Runtime settings for [`crate::api::PublishApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// SQLite database file, created and migrated on first open.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rotated log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl ApiConfig {
    /// Database at `db_path`, defaults for everything else.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Reads `PUBLISH_DB_PATH`, `PUBLISH_LOG_LEVEL` and `PUBLISH_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

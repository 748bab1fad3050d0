//! Database configuration. Precedence, lowest first: defaults, a TOML file, environment.

use crate::errors::DbError;
use crate::query::telemetry::DEFAULT_SLOW_QUERY_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "BOOKSHELF_DB";
pub const ENV_LOG_DIR: &str = "BOOKSHELF_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "BOOKSHELF_LOG_LEVEL";
pub const ENV_LOG_RETENTION: &str = "BOOKSHELF_LOG_RETENTION";
pub const ENV_SLOW_QUERY_MS: &str = "BOOKSHELF_SLOW_QUERY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Write-ahead log file; `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// Directory for `app.log`, `audit.log` and `metrics.log`; `None` leaves logging alone.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_retention: usize,
    pub slow_query_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: None,
            log_dir: None,
            log_level: "info".to_string(),
            log_retention: 7,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
        }
    }
}

impl DbConfig {
    /// # Errors
    /// Returns `DbError::ConfigError` if the text is not a valid config table.
    pub fn from_toml_str(text: &str) -> Result<Self, DbError> {
        toml::from_str(text).map_err(|e| DbError::ConfigError(e.to_string()))
    }

    /// # Errors
    /// Returns an I/O error if the file cannot be read, or `ConfigError` if it does not parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
            .map_err(|e| DbError::ConfigError(format!("{}: {e}", path.as_ref().display())))
    }

    /// Defaults, then `file` if given, then the process environment.
    ///
    /// # Errors
    /// See [`DbConfig::from_file`] and [`DbConfig::apply_env_with`].
    pub fn load(file: Option<&Path>) -> Result<Self, DbError> {
        let cfg = match file {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` if a numeric variable does not parse.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup(ENV_DB) {
            self.path = Some(PathBuf::from(p));
        }
        if let Some(d) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(d));
        }
        if let Some(l) = lookup(ENV_LOG_LEVEL) {
            self.log_level = l;
        }
        if let Some(r) = lookup(ENV_LOG_RETENTION) {
            self.log_retention = parse_number(ENV_LOG_RETENTION, &r)?;
        }
        if let Some(ms) = lookup(ENV_SLOW_QUERY_MS) {
            self.slow_query_ms = parse_number(ENV_SLOW_QUERY_MS, &ms)?;
        }
        Ok(self)
    }

    /// Install logging (when `log_dir` is set) and the slow-query threshold.
    ///
    /// # Errors
    /// Returns a logger error if the appenders cannot be created.
    pub fn apply_ambient(&self) -> Result<(), DbError> {
        crate::query::telemetry::set_slow_query_ms(self.slow_query_ms);
        if let Some(dir) = &self.log_dir {
            crate::utils::logger::configure_logging(Some(dir.as_path()), Some(&self.log_level), Some(self.log_retention))?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, DbError> {
    raw.trim()
        .parse()
        .map_err(|_| DbError::ConfigError(format!("{key} must be a non-negative integer, got '{raw}'")))
}

//! Worker configuration read from the environment or a JSON file.
//!
//! Every setting has an environment variable; only the blob root is
//! mandatory. The database URL is optional here because only the Postgres
//! wiring needs it, and [`ArchivalConfig::database_url`] reports its
//! absence at that point.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::archival::{
    domain::DEFAULT_SNAPSHOT_PREFIX,
    services::{DEFAULT_WORKER_ID, UnmappedStatePolicy},
};

const DEFAULT_DB_POOL_SIZE: u32 = 4;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_DB_POOL_SIZE: &str = "ARCHIVAL_DB_POOL_SIZE";
const ENV_BLOB_ROOT: &str = "ARCHIVAL_BLOB_ROOT";
const ENV_BLOB_PREFIX: &str = "ARCHIVAL_BLOB_PREFIX";
const ENV_UNMAPPED_STATE_POLICY: &str = "ARCHIVAL_UNMAPPED_STATE_POLICY";
const ENV_JOB_DEADLINE_SECS: &str = "ARCHIVAL_JOB_DEADLINE_SECS";
const ENV_LOG_FORMAT: &str = "ARCHIVAL_LOG_FORMAT";
const ENV_WORKER_ID: &str = "ARCHIVAL_WORKER_ID";

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A mandatory setting was not supplied.
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    /// A setting was supplied with an unusable value.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// The configuration file is not valid JSON for this shape.
    #[error("failed to parse configuration file {path}: {reason}")]
    Parse {
        /// File path.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Settings for the archival worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchivalConfig {
    /// Postgres connection URL.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: u32,
    /// Directory that holds snapshot blobs.
    pub blob_root: String,
    /// Prefix prepended to snapshot names.
    #[serde(default = "default_blob_prefix")]
    pub blob_prefix: String,
    /// Handling of task state references that cannot be remapped.
    #[serde(default)]
    pub unmapped_state_policy: UnmappedStatePolicy,
    /// Per-run deadline in seconds.
    #[serde(default)]
    pub job_deadline_secs: Option<u64>,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Name recorded on job records.
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
}

const fn default_db_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_blob_prefix() -> String {
    DEFAULT_SNAPSHOT_PREFIX.to_owned()
}

fn default_worker_id() -> String {
    DEFAULT_WORKER_ID.to_owned()
}

impl ArchivalConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the blob root is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `get_env`, which maps a variable
    /// name to its value.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the blob root is missing or a value
    /// cannot be parsed.
    pub fn from_lookup<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| get_env(name).filter(|value| !value.trim().is_empty());

        let config = Self {
            database_url: read(ENV_DATABASE_URL),
            db_pool_size: parse_var(ENV_DB_POOL_SIZE, read(ENV_DB_POOL_SIZE))?
                .unwrap_or(DEFAULT_DB_POOL_SIZE),
            blob_root: read(ENV_BLOB_ROOT).ok_or(ConfigError::Missing(ENV_BLOB_ROOT))?,
            blob_prefix: read(ENV_BLOB_PREFIX).unwrap_or_else(default_blob_prefix),
            unmapped_state_policy: parse_var(
                ENV_UNMAPPED_STATE_POLICY,
                read(ENV_UNMAPPED_STATE_POLICY),
            )?
            .unwrap_or_default(),
            job_deadline_secs: parse_var(ENV_JOB_DEADLINE_SECS, read(ENV_JOB_DEADLINE_SECS))?,
            log_format: parse_var(ENV_LOG_FORMAT, read(ENV_LOG_FORMAT))?.unwrap_or_default(),
            worker_id: read(ENV_WORKER_ID).unwrap_or_else(default_worker_id),
        };
        config.validate()
    }

    /// Reads the configuration from a JSON file whose keys are the field
    /// names of this struct.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] when the file
    /// cannot be loaded, and [`ConfigError::Invalid`] when a value is out of
    /// range.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source: std::io::Error| ConfigError::Read {
            path: path.to_owned(),
            source: Arc::new(source),
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
        let dir = cap_std::fs_utf8::Dir::open_ambient_dir(parent, cap_std::ambient_authority())
            .map_err(read_error)?;
        let contents = dir.read_to_string(file_name).map_err(read_error)?;
        let config: Self = serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        config.validate()
    }

    /// Returns the blob root as a path.
    #[must_use]
    pub fn blob_root(&self) -> &Utf8Path {
        Utf8Path::new(&self.blob_root)
    }

    /// Returns the database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no URL was configured.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_DATABASE_URL))
    }

    /// Returns the per-run deadline, if any.
    #[must_use]
    pub fn job_deadline(&self) -> Option<Duration> {
        self.job_deadline_secs.map(Duration::from_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.db_pool_size == 0 {
            return Err(invalid(ENV_DB_POOL_SIZE, "0", "pool size must be positive"));
        }
        if self.job_deadline_secs == Some(0) {
            return Err(invalid(
                ENV_JOB_DEADLINE_SECS,
                "0",
                "deadline must be positive",
            ));
        }
        if self.blob_prefix.trim_matches('/').is_empty() {
            return Err(invalid(
                ENV_BLOB_PREFIX,
                &self.blob_prefix,
                "prefix must name at least one path segment",
            ));
        }
        if self.worker_id.trim().is_empty() {
            return Err(invalid(ENV_WORKER_ID, &self.worker_id, "worker id is blank"));
        }
        Ok(self)
    }
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_owned(),
        reason: reason.into(),
    }
}

fn parse_var<T>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|err| invalid(name, &value, err.to_string()))
    })
    .transpose()
}

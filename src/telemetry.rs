//! Tracing subscriber setup for the worker binary.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::config::LogFormat;

/// Filter applied when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Builds the event filter from `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`].
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] if the fallback does not parse.
pub fn env_filter() -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .map_err(|err| TelemetryError::Filter(err.to_string()))
}

/// Installs a global subscriber writing to stderr in `format`.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TelemetryError> {
    let filter = env_filter()?;
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Plain => Box::new(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        ),
        LogFormat::Json => Box::new(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        ),
    };
    Registry::default()
        .with(layer)
        .try_init()
        .map_err(|err| TelemetryError::Install(err.to_string()))
}

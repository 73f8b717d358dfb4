//! Tracing subscriber installation.

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// Directive that failed.
        filter: String,
        /// Parser message.
        reason: String,
    },
}

/// Builds the event filter: `RUST_LOG` when set, otherwise `config.filter`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive
/// does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::InvalidFilter {
            filter: config.filter.clone(),
            reason: err.to_string(),
        })
    })
}

/// Installs the global subscriber.
///
/// Returns `false` when a subscriber was already installed, leaving it in
/// place.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the filter does not parse.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, TelemetryError> {
    let filter = env_filter(config)?;
    let installed = match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(fmt::layer().compact().with_target(false))
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_current_span(true))
            .with(filter)
            .try_init(),
    };
    Ok(installed.is_ok())
}

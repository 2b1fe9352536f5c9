//! Observability setup.
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`, or by the
//! configured directive when `RUST_LOG` is unset.

#![warn(missing_docs, clippy::pedantic)]

use blueprint_config::TelemetrySettings;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive is malformed.
    #[error("invalid log filter: {source}")]
    InvalidFilter {
        /// Parser error.
        #[from]
        source: ParseError,
    },
}

/// Builds the filter: `RUST_LOG` when set and valid, else `settings.filter`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive is
/// malformed.
pub fn env_filter(settings: &TelemetrySettings) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&settings.filter)?),
    }
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already installed, so
/// repeated calls are harmless.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive is
/// malformed.
pub fn init_tracing(settings: &TelemetrySettings) -> Result<bool, TelemetryError> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings)?)
        .with_target(settings.with_target)
        .compact()
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = %settings.filter, "tracing initialised");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let settings = TelemetrySettings::default();
        init_tracing(&settings).unwrap();
        assert!(!init_tracing(&settings).unwrap());
    }

    #[test]
    fn malformed_directive_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = TelemetrySettings {
            filter: "blueprint=notalevel".to_owned(),
            with_target: true,
        };
        assert!(matches!(env_filter(&settings), Err(TelemetryError::InvalidFilter { .. })));
    }
}

//! Logging and metrics bootstrap for processes embedding the rights
//! subsystem.
//!
//! Both initializers are process-global and should be called once at
//! startup, before the first request.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::metrics::describe_metrics;

/// Structured logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// JSON output (production) vs human-readable text (development).
    pub json_format: bool,
    /// Default level when `RUST_LOG` is not set.
    pub default_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Default::default()
        }
    }

    pub fn text() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }
}

/// Initializes the global tracing subscriber.
///
/// Subsequent calls have no effect; the first subscriber wins.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    if config.json_format {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}

/// Error initializing the metrics recorder.
#[derive(Debug, Error)]
pub enum MetricsInitError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the Prometheus metrics recorder and registers the rights
/// counters.
///
/// Returns the handle used to render the exposition text; serving it on
/// an endpoint is the host process's concern.
pub fn init_metrics() -> Result<PrometheusHandle, MetricsInitError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsInitError::AlreadyInstalled)?;
    describe_metrics();
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_config_builders() {
        assert!(LoggingConfig::json().json_format);
        assert!(!LoggingConfig::text().json_format);
        let config = LoggingConfig::text().with_level(Level::DEBUG);
        assert_eq!(config.default_level, Level::DEBUG);
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LoggingConfig::text());
        init_logging(LoggingConfig::json());
    }
}

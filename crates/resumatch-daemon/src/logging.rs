use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::cli::LogFormat;
use crate::error::DaemonError;

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
/// Records from the `log` facade are forwarded into it.
pub fn init(default_filter: &str, format: LogFormat) -> Result<(), DaemonError> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))
            .map_err(|e| DaemonError::Logging(e.to_string()))?;

    LogTracer::init().map_err(|e| DaemonError::Logging(e.to_string()))?;

    let registry = Registry::default().with(filter);
    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    result.map_err(|e| DaemonError::Logging(e.to_string()))
}

//! Tracing subscriber setup.

use domwatch_supervisor::SupervisorError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "DOMWATCH_LOG";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Install the global subscriber, writing to stderr.
///
/// The filter comes from `DOMWATCH_LOG`, then `RUST_LOG`, then `level`.
///
/// # Errors
/// Returns [`SupervisorError::LoggerInit`] if `level` is not a valid filter
/// or a global subscriber is already installed.
pub fn init(level: &str, format: LogFormat) -> Result<(), SupervisorError> {
    let filter = match EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_from_default_env()) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| SupervisorError::LoggerInit(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| SupervisorError::LoggerInit(e.to_string()))
}

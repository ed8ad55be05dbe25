//! Errors raised while installing the logging pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Why [`setup_logging`](crate::setup_logging) could not install logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level or one of the directives is not a valid filter.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// The offending level or directive.
        directive: String,
        /// Parser message.
        message: String,
    },

    /// The directory for rolling log files could not be created.
    #[error("cannot create log directory {}: {source}", path.display())]
    LogDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The rolling file appender could not open its first file.
    #[error("cannot open rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// Another global subscriber was installed first.
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Result alias for logging setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

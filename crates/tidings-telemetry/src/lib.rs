//! Tidings Telemetry - Logging for the tidings notification center.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup with multiple formats
//! - Output to stdout, stderr, or rotating log files
//! - With the `config` feature, conversion from `tidings_config::LoggingSection`
//!
//! # Example
//!
//! ```rust,no_run
//! use tidings_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tidings_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("tidings_events=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};

//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted `dispatch.panic_policy` values.
pub const PANIC_POLICIES: [&str; 2] = ["isolate", "propagate"];

/// Accepted `logging.level` values.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_dispatch(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_dispatch(config: &Config) -> ConfigResult<()> {
    if config.dispatch.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "dispatch.name".to_owned(),
            message: "center name must not be empty".to_owned(),
        });
    }

    one_of(
        "dispatch.panic_policy",
        "panic policy",
        &config.dispatch.panic_policy,
        &PANIC_POLICIES,
    )
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    one_of("logging.level", "log level", &config.logging.level, &LOG_LEVELS)?;
    one_of("logging.format", "log format", &config.logging.format, &LOG_FORMATS)
}

fn one_of(field: &str, what: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported {what} '{value}'; expected one of: {}",
            allowed.join(", ")
        ),
    })
}

//! Config file loading and layering.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, if given and present
//! 3. Apply `TIDINGS_*` environment overrides
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration from the optional file and the process environment.
///
/// A missing file is not an error; the defaults are used instead.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
/// the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Load configuration with an explicit environment map.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
/// the merged configuration fails validation.
pub fn load_with_env<S: BuildHasher>(
    path: Option<&Path>,
    env: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged = defaults()?;

    let overlay = match path {
        Some(path) => try_load_file(path)?.map(|overlay| (overlay, path)),
        None => None,
    };
    if let Some((overlay, path)) = overlay {
        deep_merge(&mut merged, overlay);
        info!(path = %path.display(), "loaded config file");
    }

    apply_env_overrides(&mut merged, env);
    finish(merged, "<merged>")
}

/// Parse configuration from a TOML string layered over the defaults.
///
/// Environment variables are not consulted.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is not valid TOML or the result
/// fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    let overlay: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;

    let mut merged = defaults()?;
    deep_merge(&mut merged, overlay);
    finish(merged, "<string>")
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in the overlay replaces the base value.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the tidings notification center.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tidings_config::Config;
//!
//! // Defaults → optional file → TIDINGS_* environment overrides.
//! let config = Config::load(Some(std::path::Path::new("tidings.toml"))).unwrap();
//! println!("panic policy: {}", config.dispatch.panic_policy);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`TIDINGS_CENTER_NAME`, `TIDINGS_PANIC_POLICY`,
//!    `TIDINGS_LOG_LEVEL`, `TIDINGS_LOG_FORMAT`)
//! 2. **Config file** passed to [`Config::load`]
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal tidings crates**.
//! Conversion into domain types (`CenterOptions`, `LogConfig`) happens in
//! those crates behind their `config` feature.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse configuration from a TOML string layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the string is malformed or fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }
}

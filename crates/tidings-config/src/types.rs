//! Configuration types for tidings.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notification center behaviour.
    pub dispatch: DispatchSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

impl Config {
    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Render the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn to_json_string(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// DispatchSection
// ---------------------------------------------------------------------------

/// Notification center settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Center name, attached to every log line the center emits.
    pub name: String,
    /// What to do when a subscriber panics: `"isolate"` (log and continue
    /// with the remaining subscribers) or `"propagate"` (unwind out of
    /// `post`).
    pub panic_policy: String,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            panic_policy: "isolate".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tidings_events=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[dispatch]\n[logging]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config: Config = toml::from_str("[dispatch]\npanic_policy = \"propagate\"\n").unwrap();
        assert_eq!(config.dispatch.name, "default");
        assert_eq!(config.dispatch.panic_policy, "propagate");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();

        let toml_out = config.to_toml_string().unwrap();
        assert!(toml_out.contains("[dispatch]"));
        assert!(toml_out.contains("panic_policy = \"isolate\""));

        let json_out = config.to_json_string().unwrap();
        assert!(json_out.contains("\"format\": \"compact\""));
    }
}

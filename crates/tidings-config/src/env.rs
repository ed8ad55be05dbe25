//! Environment variable overrides.
//!
//! Recognised variables replace the value at their mapped config path,
//! taking precedence over both the embedded defaults and the config file.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

/// Environment variables and the config paths they override.
pub const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("TIDINGS_CENTER_NAME", "dispatch.name"),
    ("TIDINGS_PANIC_POLICY", "dispatch.panic_policy"),
    ("TIDINGS_LOG_LEVEL", "logging.level"),
    ("TIDINGS_LOG_FORMAT", "logging.format"),
];

/// Apply recognised overrides to a merged TOML tree.
///
/// Returns the config paths that were overridden.
pub fn apply_env_overrides<S: BuildHasher>(
    root: &mut toml::Value,
    env: &HashMap<String, String, S>,
) -> Vec<&'static str> {
    let mut applied = Vec::new();
    for (var, path) in ENV_OVERRIDES {
        let Some(value) = env.get(var) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        set_field(root, path, value);
        debug!(var, path, "applied environment override");
        applied.push(path);
    }
    applied
}

/// Snapshot the `TIDINGS_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("TIDINGS_"))
        .collect()
}

/// Set a dotted `section.key` path, creating the section if needed.
fn set_field(root: &mut toml::Value, path: &str, value: &str) {
    let Some((section, key)) = path.split_once('.') else {
        return;
    };
    let Some(table) = root.as_table_mut() else {
        return;
    };
    let section = table
        .entry(section)
        .or_insert(toml::Value::Table(toml::map::Map::new()));
    if let Some(section) = section.as_table_mut() {
        section.insert(key.to_owned(), toml::Value::String(value.to_owned()));
    }
}

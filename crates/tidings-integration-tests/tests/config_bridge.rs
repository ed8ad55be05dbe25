//! Integration tests for wiring configuration into the center and logging.

use std::collections::HashMap;

use tidings_config::{Config, ConfigError, loader};
use tidings_events::{CenterOptions, NotificationCenter, PanicPolicy};
use tidings_telemetry::{LogConfig, LogFormat};
use tidings_test::{Recorder, TestEvent};

#[test]
fn test_default_config_builds_isolating_center() {
    let config = Config::default();
    let options = CenterOptions::from(&config.dispatch);

    assert_eq!(options, CenterOptions::default());
    assert_eq!(options.panic_policy, PanicPolicy::Isolate);
}

#[test]
fn test_config_file_drives_center_and_logging() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tidings.toml");
    std::fs::write(
        &path,
        r#"
[dispatch]
name = "editor"
panic_policy = "propagate"

[logging]
level = "debug"
format = "json"
directives = ["tidings_events=trace"]
"#,
    )
    .unwrap();

    let config = loader::load_with_env(Some(&path), &HashMap::<String, String>::new()).unwrap();

    let center = NotificationCenter::with_options(CenterOptions::from(&config.dispatch));
    assert_eq!(center.options().name, "editor");
    assert_eq!(center.options().panic_policy, PanicPolicy::Propagate);

    let logging = LogConfig::from(&config.logging);
    assert_eq!(logging.level, "debug");
    assert_eq!(logging.format, LogFormat::Json);
    assert_eq!(logging.directives, vec!["tidings_events=trace"]);
}

#[test]
fn test_env_override_reaches_center() {
    let mut env = HashMap::new();
    env.insert("TIDINGS_PANIC_POLICY".to_string(), "propagate".to_string());
    env.insert("TIDINGS_CENTER_NAME".to_string(), "from-env".to_string());

    let config = loader::load_with_env(None, &env).unwrap();
    let options = CenterOptions::from(&config.dispatch);

    assert_eq!(options.name, "from-env");
    assert_eq!(options.panic_policy, PanicPolicy::Propagate);
}

#[test]
fn test_invalid_policy_is_rejected_before_reaching_center() {
    let result = Config::from_toml_str("[dispatch]\npanic_policy = \"swallow\"\n");
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn test_configured_center_dispatches() {
    let config = Config::from_toml_str("[dispatch]\nname = \"configured\"\n").unwrap();
    let center = NotificationCenter::with_options(CenterOptions::from(&config.dispatch));
    let recorder = Recorder::<String>::new();

    let _token = center
        .observe::<TestEvent>()
        .map(|e| e.value.clone())
        .subscribe(recorder.sink());
    center.post(TestEvent::new("foobar"));

    assert_eq!(recorder.values(), vec!["foobar"]);
}

//! Tests for config functionality.

use crate::config::{
    CONFIG_FILE_NAME, Config, DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
    DEFAULT_STALE_THRESHOLD_SECONDS, DEFAULT_TTL_SECONDS, MAX_SECONDS, ProtectedPattern,
};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.version, 1);
    assert_eq!(config.settings.default_ttl, 300);
    assert_eq!(config.settings.stale_threshold, 120);
    assert_eq!(config.settings.heartbeat_interval, 30);
    assert_eq!(config.protected[0].pattern, "db/**/*");
    assert_eq!(config.protected[0].name.as_deref(), Some("Database"));
    assert!(config.pattern_strings().contains(&".env*"));
    config.validate().unwrap();
}

#[test]
fn test_parse_empty_yaml_uses_defaults() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
protected:
  - pattern: "db/schema/*"
    name: Schema
settings:
  default_ttl: 60
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.protected.len(), 1);
    assert_eq!(config.protected[0].pattern, "db/schema/*");
    assert_eq!(config.protected[0].name.as_deref(), Some("Schema"));
    assert_eq!(config.protected[0].description, None);

    assert_eq!(config.settings.default_ttl, 60);
    assert_eq!(
        config.settings.stale_threshold,
        DEFAULT_STALE_THRESHOLD_SECONDS
    );
    assert_eq!(
        config.settings.heartbeat_interval,
        DEFAULT_HEARTBEAT_INTERVAL_SECONDS
    );
}

#[test]
fn test_zero_settings_fall_back_to_defaults() {
    let yaml = r#"
settings:
  default_ttl: 0
  stale_threshold: 0
  heartbeat_interval: 5
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.settings.default_ttl, DEFAULT_TTL_SECONDS);
    assert_eq!(
        config.settings.stale_threshold,
        DEFAULT_STALE_THRESHOLD_SECONDS
    );
    assert_eq!(config.settings.heartbeat_interval, 5);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
version: 2
logical:
  - name: auth
    files: ["src/auth/**"]
protected:
  - pattern: "*.lock"
future_setting: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.version, 2);
    assert_eq!(config.pattern_strings(), vec!["*.lock"]);
}

#[test]
fn test_invalid_glob_is_rejected() {
    let yaml = r#"
protected:
  - pattern: "db/{schema"
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("protected[0].pattern"));
}

#[test]
fn test_empty_pattern_is_rejected() {
    let config = Config {
        protected: vec![ProtectedPattern {
            pattern: "  ".to_string(),
            name: None,
            description: None,
        }],
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_oversized_settings_are_rejected() {
    let yaml = "settings:\n  stale_threshold: 100000000000000000\n";
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("settings.stale_threshold"));

    let mut config = Config::default();
    config.settings.default_ttl = MAX_SECONDS;
    assert!(config.validate().is_ok());
    config.settings.default_ttl = MAX_SECONDS + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_malformed_yaml_is_user_error() {
    let err = Config::from_yaml("protected: [unterminated").unwrap_err();
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_save_and_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.settings.default_ttl = 42;

    config.save(temp_dir.path()).unwrap();
    let loaded = Config::load(temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_or_default(temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_or_default_surfaces_parse_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "settings: [1, 2").unwrap();

    assert!(Config::load_or_default(&path).is_err());
}

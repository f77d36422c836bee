//! Tests for manifest validation.

use flux_config::{ConfigError, MAX_PROXY_PORT, ProjectConfig, validate};
use serde_json::json;

fn field_of(err: ConfigError) -> String {
    match err {
        ConfigError::InvalidValue { field, .. } | ConfigError::MissingField { field, .. } => field,
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn defaults_are_valid() {
    assert!(validate(&ProjectConfig::default()).is_ok());
}

#[test]
fn port_zero_is_rejected() {
    let mut config = ProjectConfig::default();
    config.port = 0;
    assert_eq!(field_of(validate(&config).unwrap_err()), "port");
}

#[test]
fn port_without_room_for_children_is_rejected() {
    let mut config = ProjectConfig::default();
    config.port = u16::MAX;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("65535"));
    assert_eq!(field_of(err), "port");

    config.port = MAX_PROXY_PORT;
    assert!(validate(&config).is_ok());
}

#[test]
fn dev_cmd_must_carry_port_placeholder() {
    let mut config = ProjectConfig::default();
    config.frontend.dev_cmd = "npm run dev".to_string();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("{{port}}"));
    assert_eq!(field_of(err), "frontend.devCmd");
}

#[test]
fn blank_dev_cmd_is_missing() {
    let mut config = ProjectConfig::default();
    config.frontend.dev_cmd = "   ".to_string();
    assert!(matches!(
        validate(&config),
        Err(ConfigError::MissingField { .. })
    ));
}

#[test]
fn extension_needs_leading_dot() {
    let mut config = ProjectConfig::default();
    config.backend.extension = "go".to_string();
    assert_eq!(field_of(validate(&config).unwrap_err()), "backend.extension");
}

#[test]
fn source_roots_cannot_be_empty() {
    let mut config = ProjectConfig::default();
    config.backend.source_roots.clear();
    assert_eq!(
        field_of(validate(&config).unwrap_err()),
        "backend.sourceRoots"
    );
}

#[test]
fn blank_run_cmd_is_missing() {
    let mut config = ProjectConfig::default();
    config.backend.run_cmd = String::new();
    assert_eq!(field_of(validate(&config).unwrap_err()), "backend.runCmd");
}

#[test]
fn api_client_must_be_a_mapping() {
    let mut config = ProjectConfig::default();
    config.api_client = json!("orval");
    assert_eq!(field_of(validate(&config).unwrap_err()), "apiClient");

    config.api_client = json!({ "command": "orval" });
    assert!(validate(&config).is_ok());
}

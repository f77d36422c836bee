//! Tests for default values and edge cases.

use flux_config::{BackendConfig, FrontendConfig, ProjectConfig};
use std::path::PathBuf;

#[test]
fn project_config_defaults() {
    let config = ProjectConfig::default();
    assert_eq!(config.port, 3000);
    assert!(config.name.is_empty());
    assert!(config.api_client.is_null());
}

#[test]
fn frontend_defaults() {
    let frontend = FrontendConfig::default();
    assert_eq!(frontend.dir, PathBuf::from("frontend"));
    assert!(frontend.dev_cmd.contains("{{port}}"));
    assert_eq!(frontend.build_cmd, "npm run build");
    assert!(frontend.install_cmd.is_none());
}

#[test]
fn backend_defaults() {
    let backend = BackendConfig::default();
    assert_eq!(backend.extension, ".go");
    assert_eq!(backend.source_roots, vec![PathBuf::from(".")]);
    assert_eq!(backend.run_cmd, "go run {{entry}} --dev");
    assert_eq!(backend.install_cmd, "go mod download");
    assert_eq!(backend.banner, "flux");
}

#[test]
fn empty_yaml_document_yields_defaults() {
    let config: ProjectConfig = serde_json::from_str("{}").expect("parse");
    assert_eq!(config, ProjectConfig::default());
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config: ProjectConfig = serde_json::from_str(
        r#"{ "frontend": { "devCmd": "pnpm dev --port {{port}}" }, "backend": { "router": "echo" } }"#,
    )
    .expect("parse");

    assert_eq!(config.frontend.dev_cmd, "pnpm dev --port {{port}}");
    assert_eq!(config.frontend.dir, PathBuf::from("frontend"));
    assert_eq!(config.backend.router, "echo");
    assert_eq!(config.backend.extension, ".go");
}

#[test]
fn unknown_fields_are_ignored() {
    let config: ProjectConfig =
        serde_json::from_str(r#"{ "port": 4100, "deploy": { "region": "eu" } }"#).expect("parse");
    assert_eq!(config.port, 4100);
}

#[test]
fn api_client_is_kept_verbatim() {
    let config: ProjectConfig = serde_json::from_str(
        r#"{ "apiClient": { "command": "orval --input {{spec}}", "extra": [1, 2] } }"#,
    )
    .expect("parse");
    assert_eq!(config.api_client["extra"][1], 2);
    assert_eq!(config.api_client["command"], "orval --input {{spec}}");
}

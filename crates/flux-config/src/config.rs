//! The project manifest (`flux.yaml`).
//!
//! `ProjectConfig` is the process-wide configuration consumed by the dev
//! orchestrator. Unknown fields are ignored so manifests written for newer
//! tooling still load. The `apiClient` subtree is kept as raw JSON and handed
//! to the client generator untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sections::{BackendConfig, FrontendConfig};

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "flux.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project name, used in banners only.
    #[serde(default)]
    pub name: String,

    /// Proxy port: the single origin the browser talks to.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub frontend: FrontendConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Opaque generator settings.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub api_client: Value,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            port: default_port(),
            frontend: FrontendConfig::default(),
            backend: BackendConfig::default(),
            api_client: Value::Null,
        }
    }
}

/// A manifest field whose change requires a backend restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    ProxyPort,
    FrontendDevCmd,
    BackendRouter,
}

impl RestartReason {
    /// Manifest path of the field, as written in `flux.yaml`.
    pub fn field(&self) -> &'static str {
        match self {
            RestartReason::ProxyPort => "port",
            RestartReason::FrontendDevCmd => "frontend.devCmd",
            RestartReason::BackendRouter => "backend.router",
        }
    }
}

impl std::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

impl ProjectConfig {
    /// Fields that differ between `self` (live) and `next` and require the
    /// backend to be restarted. Every other field is applied in place.
    pub fn restart_reasons(&self, next: &ProjectConfig) -> Vec<RestartReason> {
        let mut reasons = Vec::new();
        if self.port != next.port {
            reasons.push(RestartReason::ProxyPort);
        }
        if self.frontend.dev_cmd != next.frontend.dev_cmd {
            reasons.push(RestartReason::FrontendDevCmd);
        }
        if self.backend.router != next.backend.router {
            reasons.push(RestartReason::BackendRouter);
        }
        reasons
    }

    /// Display name, falling back to the project directory name.
    pub fn display_name<'a>(&'a self, root: &'a std::path::Path) -> std::borrow::Cow<'a, str> {
        if !self.name.is_empty() {
            return std::borrow::Cow::Borrowed(self.name.as_str());
        }
        root.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(std::borrow::Cow::Borrowed("flux"))
    }
}

fn default_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unchanged_config_needs_no_restart() {
        let live = ProjectConfig::default();
        assert!(live.restart_reasons(&live.clone()).is_empty());
    }

    #[test]
    fn name_and_build_cmd_changes_apply_in_place() {
        let live = ProjectConfig::default();
        let mut next = live.clone();
        next.name = "renamed".to_string();
        next.frontend.build_cmd = "vite build --mode staging".to_string();
        next.api_client = json!({ "output": "src/client" });
        assert!(live.restart_reasons(&next).is_empty());
    }

    #[test]
    fn canonical_fields_trigger_restart() {
        let live = ProjectConfig::default();
        let mut next = live.clone();
        next.port = 3100;
        next.backend.router = "echo".to_string();
        assert_eq!(
            live.restart_reasons(&next),
            vec![RestartReason::ProxyPort, RestartReason::BackendRouter]
        );
    }

    #[test]
    fn display_name_falls_back_to_directory() {
        let config = ProjectConfig::default();
        let root = std::path::Path::new("/work/shop");
        assert_eq!(config.display_name(root), "shop");
    }
}

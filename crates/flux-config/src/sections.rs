//! Frontend and backend sections of the manifest.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder substituted with the frontend port in `devCmd`.
pub const PORT_PLACEHOLDER: &str = "{{port}}";
/// Placeholder substituted with the backend package path.
pub const ENTRY_PLACEHOLDER: &str = "{{entry}}";
/// Placeholder substituted with the OpenAPI output path.
pub const OUTPUT_PLACEHOLDER: &str = "{{output}}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendConfig {
    /// Frontend directory, relative to the project root.
    #[serde(default = "default_frontend_dir")]
    pub dir: PathBuf,

    /// Dev server command; `{{port}}` is replaced with the assigned port.
    #[serde(default = "default_dev_cmd")]
    pub dev_cmd: String,

    /// Production build command. Not run by the orchestrator.
    #[serde(default = "default_build_cmd")]
    pub build_cmd: String,

    /// Overrides the install command detected from lockfiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_cmd: Option<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dir: default_frontend_dir(),
            dev_cmd: default_dev_cmd(),
            build_cmd: default_build_cmd(),
            install_cmd: None,
        }
    }
}

impl FrontendConfig {
    /// The dev command with the port substituted.
    pub fn render_dev_cmd(&self, port: u16) -> String {
        self.dev_cmd.replace(PORT_PLACEHOLDER, &port.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Router flavor the project was scaffolded with.
    #[serde(default = "default_router")]
    pub router: String,

    /// Source extension that triggers restarts.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Directories watched for backend sources, relative to the project root.
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<PathBuf>,

    /// Command that runs the backend in development mode.
    #[serde(default = "default_run_cmd")]
    pub run_cmd: String,

    /// Command that writes the OpenAPI document to `{{output}}`.
    #[serde(default = "default_spec_cmd")]
    pub spec_cmd: String,

    /// Dependency install command, run when a `go.mod` is present.
    #[serde(default = "default_backend_install_cmd")]
    pub install_cmd: String,

    /// Banner marker printed by the backend once it listens.
    #[serde(default = "default_banner")]
    pub banner: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            router: default_router(),
            extension: default_extension(),
            source_roots: default_source_roots(),
            run_cmd: default_run_cmd(),
            spec_cmd: default_spec_cmd(),
            install_cmd: default_backend_install_cmd(),
            banner: default_banner(),
        }
    }
}

impl BackendConfig {
    pub fn render_run_cmd(&self, entry: &str) -> String {
        self.run_cmd.replace(ENTRY_PLACEHOLDER, entry)
    }

    pub fn render_spec_cmd(&self, entry: &str, output: &std::path::Path) -> String {
        self.spec_cmd
            .replace(ENTRY_PLACEHOLDER, entry)
            .replace(OUTPUT_PLACEHOLDER, &output.display().to_string())
    }
}

fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

fn default_dev_cmd() -> String {
    "npm run dev -- --port {{port}} --strictPort".to_string()
}

fn default_build_cmd() -> String {
    "npm run build".to_string()
}

fn default_router() -> String {
    "chi".to_string()
}

fn default_extension() -> String {
    ".go".to_string()
}

fn default_source_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_run_cmd() -> String {
    "go run {{entry}} --dev".to_string()
}

fn default_spec_cmd() -> String {
    "go run {{entry}} openapi {{output}}".to_string()
}

fn default_backend_install_cmd() -> String {
    "go mod download".to_string()
}

fn default_banner() -> String {
    "flux".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn dev_cmd_substitutes_every_placeholder() {
        let frontend = FrontendConfig {
            dev_cmd: "serve --port {{port}} --hmr-port {{port}}".to_string(),
            ..FrontendConfig::default()
        };
        assert_eq!(frontend.render_dev_cmd(3001), "serve --port 3001 --hmr-port 3001");
    }

    #[test]
    fn spec_cmd_substitutes_entry_and_output() {
        let backend = BackendConfig::default();
        let cmd = backend.render_spec_cmd("./cmd/server", Path::new(".flux/openapi.json"));
        assert_eq!(cmd, "go run ./cmd/server openapi .flux/openapi.json");
    }
}

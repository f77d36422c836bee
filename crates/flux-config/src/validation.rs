//! Manifest validation.
//!
//! Runs after layering, so environment overrides are checked too.

use crate::config::ProjectConfig;
use crate::error::{ConfigError, Result};
use crate::sections::{ENTRY_PLACEHOLDER, PORT_PLACEHOLDER};

/// Highest proxy port that still leaves room for both children above it.
pub const MAX_PROXY_PORT: u16 = u16::MAX - 2;

/// Check a loaded manifest for values the orchestrator cannot work with.
pub fn validate(config: &ProjectConfig) -> Result<()> {
    if config.port == 0 || config.port > MAX_PROXY_PORT {
        return Err(ConfigError::invalid(
            "port",
            config.port,
            format!("choose a port between 1 and {MAX_PROXY_PORT}"),
        ));
    }

    let dev_cmd = config.frontend.dev_cmd.trim();
    if dev_cmd.is_empty() {
        return Err(ConfigError::MissingField {
            field: "frontend.devCmd".to_string(),
            hint: Some(format!(
                "set a dev server command, e.g. \"npm run dev -- --port {PORT_PLACEHOLDER}\""
            )),
        });
    }
    if !dev_cmd.contains(PORT_PLACEHOLDER) {
        return Err(ConfigError::invalid(
            "frontend.devCmd",
            dev_cmd,
            format!("the command must contain {PORT_PLACEHOLDER} so Flux can assign the port"),
        ));
    }

    if config.frontend.dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField {
            field: "frontend.dir".to_string(),
            hint: None,
        });
    }

    let backend = &config.backend;
    if !backend.extension.starts_with('.') || backend.extension.len() < 2 {
        return Err(ConfigError::invalid(
            "backend.extension",
            &backend.extension,
            "use a dotted extension such as \".go\"",
        ));
    }

    if backend.source_roots.is_empty() {
        return Err(ConfigError::invalid(
            "backend.sourceRoots",
            "[]",
            "list at least one directory, e.g. [\".\"]",
        ));
    }

    if backend.run_cmd.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "backend.runCmd".to_string(),
            hint: Some(format!("e.g. \"go run {ENTRY_PLACEHOLDER} --dev\"")),
        });
    }

    if !config.api_client.is_null() && !config.api_client.is_object() {
        return Err(ConfigError::invalid(
            "apiClient",
            &config.api_client,
            "apiClient must be a mapping",
        ));
    }

    Ok(())
}

//! API client regeneration.
//!
//! The backend writes its OpenAPI document through `backend.specCmd`; the
//! generator turns that document into client code under the frontend tree.
//! Nothing here is fatal: every failure becomes a warning and the dev loop
//! carries on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use super::shell;
use super::state::ConfigCell;
use super::supervisor::resolve_entrypoint;
use crate::error::DevError;
use crate::ui;

/// Scratch directory under the project root.
pub const SCRATCH_DIR: &str = ".flux";

/// Where the OpenAPI document is written, relative to the project root.
pub const SPEC_FILE: &str = ".flux/openapi.json";

/// Default client output directory, relative to the frontend directory.
pub const DEFAULT_CLIENT_OUTPUT: &str = "src/api";

/// Turns an OpenAPI document into client code.
#[async_trait]
pub trait ClientGenerator: Send + Sync {
    async fn generate(
        &self,
        spec: &Path,
        api_client: &Value,
        frontend_dir: &Path,
    ) -> Result<(), DevError>;
}

/// Runs the command configured under `apiClient.command`.
///
/// ```yaml
/// apiClient:
///   command: npx openapi-typescript {{spec}} -o {{output}}/schema.d.ts
///   output: src/api
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandGenerator;

/// Substitute `{{spec}}` and `{{output}}` into a generator command.
pub fn render_generator_command(template: &str, spec: &Path, output: &Path) -> String {
    template
        .replace("{{spec}}", &spec.display().to_string())
        .replace("{{output}}", &output.display().to_string())
}

#[async_trait]
impl ClientGenerator for CommandGenerator {
    async fn generate(
        &self,
        spec: &Path,
        api_client: &Value,
        frontend_dir: &Path,
    ) -> Result<(), DevError> {
        let Some(template) = api_client.get("command").and_then(Value::as_str) else {
            tracing::debug!("apiClient.command not set, skipping client generation");
            return Ok(());
        };
        let output = api_client
            .get("output")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CLIENT_OUTPUT);
        let output = frontend_dir.join(output);
        std::fs::create_dir_all(&output)?;

        let command = render_generator_command(template, spec, &output);
        tracing::debug!(%command, "generating API client");
        let result = shell::run(&command, frontend_dir).await?;
        if !result.success {
            return Err(DevError::Generator(result.tail(5)));
        }
        Ok(())
    }
}

/// One regeneration pass: write the spec, then feed it to the generator.
pub struct TypeRegenerator {
    root: PathBuf,
    config: Arc<ConfigCell>,
    generator: Arc<dyn ClientGenerator>,
}

impl TypeRegenerator {
    pub fn new(root: PathBuf, config: Arc<ConfigCell>, generator: Arc<dyn ClientGenerator>) -> Self {
        Self {
            root,
            config,
            generator,
        }
    }

    /// Run a pass, reporting failures as warnings. Returns whether it succeeded.
    pub async fn run(&self) -> bool {
        let started = Instant::now();
        match self.try_run().await {
            Ok(()) => {
                tracing::debug!(elapsed = ?started.elapsed(), "API client regenerated");
                true
            }
            Err(e) => {
                ui::warning(&format!("Type generation failed: {e}"));
                false
            }
        }
    }

    async fn try_run(&self) -> Result<(), DevError> {
        let config = self.config.get();
        let backend = &config.backend;

        tokio::fs::create_dir_all(self.root.join(SCRATCH_DIR)).await?;
        let entry = resolve_entrypoint(&self.root, &backend.extension)?;
        let command = backend.render_spec_cmd(&entry, Path::new(SPEC_FILE));

        let output = shell::run(&command, &self.root).await?;
        if !output.success {
            return Err(DevError::Generator(format!(
                "`{command}` failed\n{}",
                output.tail(10)
            )));
        }

        let spec = self.root.join(SPEC_FILE);
        if !spec.is_file() {
            return Err(DevError::Generator(format!(
                "`{command}` did not write {SPEC_FILE}"
            )));
        }

        let frontend_dir = self.root.join(&config.frontend.dir);
        self.generator
            .generate(&spec, &config.api_client, &frontend_dir)
            .await
    }
}

//! `flux dev`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::DevArgs;
use crate::dev::{CommandGenerator, DevOptions, Orchestrator};
use crate::error::{CliError, Result, ResultExt};
use crate::scaffold::TemplateScaffolder;
use crate::ui;

/// Execute the dev command.
///
/// Loads `flux.yaml` from the nearest project root and runs the
/// orchestrator until a termination signal arrives.
///
/// # Errors
///
/// Returns errors for:
/// - A missing or invalid manifest
/// - Boot failures (dependency install, frontend start, backend start,
///   proxy bind)
pub async fn execute(args: DevArgs) -> Result<()> {
    let start = resolve_start(args.cwd)?;
    let (root, config) = flux_config::load(&start)?;
    ui::info(&format!(
        "Starting {} in {}",
        config.display_name(&root),
        root.display()
    ));

    let orchestrator = Orchestrator::new(
        root,
        config,
        DevOptions {
            install: !args.no_install,
        },
        Arc::new(TemplateScaffolder),
        Arc::new(CommandGenerator),
    );
    orchestrator.run().await?;
    Ok(())
}

fn resolve_start(cwd: Option<PathBuf>) -> Result<PathBuf> {
    let current = std::env::current_dir().context("Failed to read the working directory")?;
    let start = match cwd {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => current.join(dir),
        None => current,
    };
    if !start.is_dir() {
        return Err(CliError::FileNotFound(start));
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            resolve_start(Some(missing)),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[test]
    fn absolute_directory_is_used_as_is() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            resolve_start(Some(dir.path().to_path_buf())).unwrap(),
            dir.path()
        );
    }
}

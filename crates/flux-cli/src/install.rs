//! Dependency installation before the children start.

use std::path::Path;

use flux_config::ProjectConfig;

use crate::dev::shell;
use crate::error::DevError;
use crate::ui::{self, Spinner};

/// JavaScript package managers, detected from lockfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Detect the package manager from lock files.
    ///
    /// Detection order (highest priority first):
    /// 1. `pnpm-lock.yaml` → pnpm
    /// 2. `yarn.lock` → yarn
    /// 3. `bun.lockb` → bun
    /// 4. Default to npm (also covers package-lock.json)
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if project_dir.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if project_dir.join("bun.lockb").exists() {
            PackageManager::Bun
        } else {
            PackageManager::Npm
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    pub fn install_cmd(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm install",
            PackageManager::Yarn => "yarn install",
            PackageManager::Pnpm => "pnpm install",
            PackageManager::Bun => "bun install",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Install command for the frontend, or `None` when nothing needs installing.
///
/// An existing `node_modules` counts as installed; a missing `package.json`
/// means there is nothing to install.
pub fn frontend_install_command(frontend_dir: &Path, configured: Option<&str>) -> Option<String> {
    if !frontend_dir.join("package.json").is_file() || frontend_dir.join("node_modules").is_dir() {
        return None;
    }
    Some(match configured {
        Some(cmd) => cmd.to_string(),
        None => PackageManager::detect(frontend_dir).install_cmd().to_string(),
    })
}

/// Install command for the backend, or `None` without a `go.mod`.
pub fn backend_install_command(root: &Path, configured: &str) -> Option<String> {
    let configured = configured.trim();
    if configured.is_empty() || !root.join("go.mod").is_file() {
        return None;
    }
    Some(configured.to_string())
}

/// Install frontend and backend dependencies as needed.
pub async fn install_dependencies(root: &Path, config: &ProjectConfig) -> Result<(), DevError> {
    let frontend_dir = root.join(&config.frontend.dir);
    if let Some(cmd) = frontend_install_command(&frontend_dir, config.frontend.install_cmd.as_deref())
    {
        run_install("frontend", &cmd, &frontend_dir).await?;
    } else {
        tracing::debug!(dir = %frontend_dir.display(), "frontend dependencies present");
    }

    if let Some(cmd) = backend_install_command(root, &config.backend.install_cmd) {
        run_install("backend", &cmd, root).await?;
    }
    Ok(())
}

async fn run_install(what: &str, command: &str, cwd: &Path) -> Result<(), DevError> {
    let spinner = Spinner::new(&format!("Installing {what} dependencies ({command})..."));
    let output = shell::run(command, cwd).await.map_err(|e| DevError::Install {
        command: command.to_string(),
        message: e.to_string(),
    })?;

    if output.success {
        spinner.finish(&format!("Installed {what} dependencies"));
        return Ok(());
    }

    spinner.fail(&format!("Installing {what} dependencies failed"));
    let tail = output.tail(15);
    if !tail.is_empty() {
        ui::error(&tail);
    }
    Err(DevError::Install {
        command: command.to_string(),
        message: match output.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_package_manager_detect_pnpm() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("pnpm-lock.yaml")).unwrap();
        assert_eq!(PackageManager::detect(temp_dir.path()), PackageManager::Pnpm);
    }

    #[test]
    fn test_package_manager_pnpm_prefers_over_yarn() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("pnpm-lock.yaml")).unwrap();
        File::create(temp_dir.path().join("yarn.lock")).unwrap();
        assert_eq!(PackageManager::detect(temp_dir.path()), PackageManager::Pnpm);
    }

    #[test]
    fn test_package_manager_detect_npm() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(PackageManager::detect(temp_dir.path()), PackageManager::Npm);
        assert_eq!(PackageManager::Npm.to_string(), "npm");
    }

    #[test]
    fn frontend_install_uses_lockfile_then_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        File::create(dir.path().join("yarn.lock")).unwrap();

        assert_eq!(
            frontend_install_command(dir.path(), None).as_deref(),
            Some("yarn install")
        );
        assert_eq!(
            frontend_install_command(dir.path(), Some("yarn install --frozen-lockfile")).as_deref(),
            Some("yarn install --frozen-lockfile")
        );
    }

    #[test]
    fn frontend_install_skips_installed_or_empty_dirs() {
        let dir = TempDir::new().unwrap();
        assert_eq!(frontend_install_command(dir.path(), None), None);

        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        assert_eq!(frontend_install_command(dir.path(), None), None);
    }

    #[test]
    fn backend_install_needs_go_mod() {
        let dir = TempDir::new().unwrap();
        assert_eq!(backend_install_command(dir.path(), "go mod download"), None);

        fs::write(dir.path().join("go.mod"), "module example.com/shop\n").unwrap();
        assert_eq!(
            backend_install_command(dir.path(), "go mod download").as_deref(),
            Some("go mod download")
        );
        assert_eq!(backend_install_command(dir.path(), "  "), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_install_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = run_install("backend", "echo 'no network' >&2; exit 2", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DevError::Install { ref message, .. } if message == "exit code 2"));
    }
}

//! Process supervisor for the frontend dev server and the backend.
//!
//! Each child lives in its own slot behind an async mutex, so starts and
//! stops of the same child never overlap. At most one backend exists at a
//! time: starting a new one first stops the old one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::platform::SpawnSpec;
use super::process::{ChildProcess, Readiness};
use super::state::{ConfigCell, PortAssignment, PortSnapshot};
use super::{ports, ChildKind, LogCapture};
use crate::error::DevError;
use crate::ui;

/// How long a child gets to report readiness.
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period for a polite stop before escalating.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the previous backend's port gets to be released.
pub const PORT_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Port variables the backend must not inherit from the parent.
pub const STRIPPED_ENV: &[&str] = &["PORT", "BACKEND_PORT", "PROXY_PORT", "FRONTEND_PORT"];

/// Environment added to the backend on top of the inherited one.
pub fn backend_env(ports: PortSnapshot) -> Vec<(String, String)> {
    vec![
        ("PORT".to_string(), ports.backend.to_string()),
        ("BACKEND_PORT".to_string(), ports.backend.to_string()),
        ("PROXY_PORT".to_string(), ports.proxy.to_string()),
        ("FRONTEND_PORT".to_string(), ports.frontend.to_string()),
        ("FLUX_DEV".to_string(), "1".to_string()),
        ("GO_ENV".to_string(), "development".to_string()),
    ]
}

/// Package path of the backend entrypoint: `.` when `main<ext>` sits at the
/// project root, `./cmd/server` for `cmd/server/main<ext>`.
pub fn resolve_entrypoint(root: &Path, extension: &str) -> Result<String, DevError> {
    let file = format!("main{extension}");
    if root.join(&file).is_file() {
        return Ok(".".to_string());
    }
    if root.join("cmd").join("server").join(&file).is_file() {
        return Ok("./cmd/server".to_string());
    }
    Err(DevError::EntrypointNotFound {
        root: root.to_path_buf(),
        ext: extension.to_string(),
    })
}

pub struct Supervisor {
    root: PathBuf,
    config: Arc<ConfigCell>,
    ports: Arc<PortAssignment>,
    capture: Arc<LogCapture>,
    backend: Mutex<Option<ChildProcess>>,
    frontend: Mutex<Option<ChildProcess>>,
}

impl Supervisor {
    pub fn new(
        root: PathBuf,
        config: Arc<ConfigCell>,
        ports: Arc<PortAssignment>,
        capture: Arc<LogCapture>,
    ) -> Self {
        Self {
            root,
            config,
            ports,
            capture,
            backend: Mutex::new(None),
            frontend: Mutex::new(None),
        }
    }

    /// (Re)start the backend and wait for it to become ready.
    pub async fn start_backend(&self) -> Result<Readiness, DevError> {
        let mut slot = self.backend.lock().await;

        if let Some(mut previous) = slot.take() {
            previous.stop(STOP_TIMEOUT).await;
        }

        let mut port = self.ports.backend();
        if !ports::await_free(port, PORT_RELEASE_TIMEOUT).await {
            let next = self
                .ports
                .rebind_backend()
                .await
                .ok_or(DevError::PortUnavailable { port })?;
            ui::warning(&format!(
                "Backend port {port} is still in use, switching to {next}"
            ));
            port = next;
        }

        let config = self.config.get();
        let backend = &config.backend;
        let entry = resolve_entrypoint(&self.root, &backend.extension)?;
        let spec = SpawnSpec {
            name: ChildKind::Backend.to_string(),
            command: backend.render_run_cmd(&entry),
            cwd: self.root.clone(),
            env_remove: STRIPPED_ENV.iter().map(|k| k.to_string()).collect(),
            env: backend_env(self.ports.snapshot()),
        };

        tracing::debug!(command = %spec.command, port, "starting backend");
        let mut child = ChildProcess::spawn(
            ChildKind::Backend,
            spec,
            port,
            &backend.banner,
            Arc::clone(&self.capture),
        )?;

        match child.wait_ready(READY_TIMEOUT).await {
            Ok(readiness) => {
                tracing::debug!(pid = child.pid(), ?readiness, "backend ready");
                *slot = Some(child);
                Ok(readiness)
            }
            Err(err) => {
                self.capture
                    .emit(ChildKind::Backend, "process exited immediately");
                child.stop(Duration::ZERO).await;
                Err(err)
            }
        }
    }

    pub async fn stop_backend(&self, grace: Duration) {
        let mut slot = self.backend.lock().await;
        if let Some(mut child) = slot.take() {
            child.stop(grace).await;
        }
    }

    pub async fn backend_alive(&self) -> bool {
        self.backend
            .lock()
            .await
            .as_ref()
            .is_some_and(ChildProcess::is_alive)
    }

    /// PID of the current backend, if one is supervised.
    pub async fn backend_pid(&self) -> Option<u32> {
        self.backend.lock().await.as_ref().map(ChildProcess::pid)
    }

    /// Spawn the frontend dev server. Readiness is awaited by the caller
    /// through the frontend port.
    pub async fn start_frontend(&self) -> Result<(), DevError> {
        let mut slot = self.frontend.lock().await;
        if let Some(mut previous) = slot.take() {
            previous.stop(STOP_TIMEOUT).await;
        }

        let config = self.config.get();
        let port = self.ports.frontend();
        let spec = SpawnSpec {
            name: ChildKind::Frontend.to_string(),
            command: config.frontend.render_dev_cmd(port),
            cwd: self.root.join(&config.frontend.dir),
            env_remove: Vec::new(),
            env: vec![
                ("PROXY_PORT".to_string(), self.ports.proxy().to_string()),
                ("FRONTEND_PORT".to_string(), port.to_string()),
            ],
        };

        tracing::debug!(command = %spec.command, port, "starting frontend");
        let child = ChildProcess::spawn(
            ChildKind::Frontend,
            spec,
            port,
            "",
            Arc::clone(&self.capture),
        )?;
        *slot = Some(child);
        Ok(())
    }

    pub async fn stop_frontend(&self, grace: Duration) {
        let mut slot = self.frontend.lock().await;
        if let Some(mut child) = slot.take() {
            child.stop(grace).await;
        }
    }

    /// Command line the running frontend was started with.
    pub async fn frontend_command(&self) -> Option<String> {
        self.frontend
            .lock()
            .await
            .as_ref()
            .map(|child| child.command().to_string())
    }

    /// Exit code of a frontend that already died, if it did.
    pub async fn frontend_exit(&self) -> Option<Option<u32>> {
        self.frontend
            .lock()
            .await
            .as_ref()
            .and_then(ChildProcess::exit_info)
            .map(|info| info.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn backend_env_carries_every_port() {
        let env = backend_env(PortSnapshot {
            proxy: 3000,
            frontend: 3001,
            backend: 3002,
        });
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("PORT"), Some("3002"));
        assert_eq!(get("BACKEND_PORT"), Some("3002"));
        assert_eq!(get("PROXY_PORT"), Some("3000"));
        assert_eq!(get("FRONTEND_PORT"), Some("3001"));
        assert_eq!(get("FLUX_DEV"), Some("1"));
        assert_eq!(get("GO_ENV"), Some("development"));
    }

    #[test]
    fn stripped_env_covers_every_port_variable() {
        let env = backend_env(PortSnapshot {
            proxy: 1,
            frontend: 2,
            backend: 3,
        });
        for key in STRIPPED_ENV {
            assert!(env.iter().any(|(k, _)| k == key), "{key} is re-added");
        }
    }

    #[test]
    fn entrypoint_prefers_root_main() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.go"), "package main").unwrap();
        fs::create_dir_all(dir.path().join("cmd/server")).unwrap();
        fs::write(dir.path().join("cmd/server/main.go"), "package main").unwrap();

        assert_eq!(resolve_entrypoint(dir.path(), ".go").unwrap(), ".");
    }

    #[test]
    fn entrypoint_falls_back_to_cmd_server() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("cmd/server")).unwrap();
        fs::write(dir.path().join("cmd/server/main.go"), "package main").unwrap();

        assert_eq!(resolve_entrypoint(dir.path(), ".go").unwrap(), "./cmd/server");
    }

    #[test]
    fn entrypoint_follows_configured_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.go"), "package main").unwrap();

        assert!(matches!(
            resolve_entrypoint(dir.path(), ".rs"),
            Err(DevError::EntrypointNotFound { .. })
        ));
    }

    #[test]
    fn missing_entrypoint_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve_entrypoint(dir.path(), ".go").unwrap_err();
        assert!(err.to_string().contains("main.go"));
    }
}

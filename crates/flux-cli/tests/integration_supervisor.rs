//! Supervisor tests against real PTY children.
#![cfg(unix)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use flux_cli::dev::process::Readiness;
use flux_cli::dev::{ports, ChildKind, ConfigCell, LogCapture, PortAssignment, Supervisor};
use flux_cli::DevError;
use flux_config::ProjectConfig;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    supervisor: Supervisor,
    capture: Arc<LogCapture>,
}

async fn project(run_cmd: &str, with_entrypoint: bool) -> Project {
    let dir = TempDir::new().unwrap();
    if with_entrypoint {
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    }

    let mut config = ProjectConfig::default();
    config.backend.run_cmd = run_cmd.to_string();

    let backend = ports::find_free(25200).await.expect("free port");
    let ports = Arc::new(PortAssignment::new(backend + 200, backend + 201, backend));
    let capture = Arc::new(LogCapture::new());
    let supervisor = Supervisor::new(
        dir.path().to_path_buf(),
        Arc::new(ConfigCell::new(config)),
        ports,
        Arc::clone(&capture),
    );
    Project {
        _dir: dir,
        supervisor,
        capture,
    }
}

async fn captured(capture: &LogCapture, needle: &str) -> bool {
    for _ in 0..50 {
        if capture.snapshot().iter().any(|e| e.line.contains(needle)) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn pid_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[tokio::test]
async fn backend_is_ready_on_its_banner_and_stops_cleanly() {
    let p = project("echo \"listening on {{entry}}\"; exec sleep 30", true).await;
    p.capture.start();

    let readiness = p.supervisor.start_backend().await.unwrap();
    assert_eq!(readiness, Readiness::Token);
    assert!(p.supervisor.backend_alive().await);
    assert!(captured(&p.capture, "listening on .").await);
    assert!(p
        .capture
        .snapshot()
        .iter()
        .all(|e| e.kind == ChildKind::Backend));

    let pid = p.supervisor.backend_pid().await.unwrap();
    p.supervisor.stop_backend(Duration::from_secs(2)).await;
    assert!(!p.supervisor.backend_alive().await);
    assert!(p.supervisor.backend_pid().await.is_none());
    assert!(!pid_exists(pid));
}

#[tokio::test]
async fn restarting_replaces_the_previous_backend() {
    let p = project("echo started; exec sleep 30", true).await;

    p.supervisor.start_backend().await.unwrap();
    let first = p.supervisor.backend_pid().await.unwrap();

    p.supervisor.start_backend().await.unwrap();
    let second = p.supervisor.backend_pid().await.unwrap();

    assert_ne!(first, second);
    assert!(!pid_exists(first));
    assert!(pid_exists(second));

    p.supervisor.stop_backend(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn early_exit_is_reported() {
    let p = project("echo 'undefined: handler'; exit 2", true).await;
    p.capture.start();

    let err = p.supervisor.start_backend().await.unwrap_err();
    assert!(matches!(err, DevError::ChildExitedEarly { .. }));
    assert!(!p.supervisor.backend_alive().await);
    assert!(captured(&p.capture, "process exited immediately").await);
}

#[tokio::test]
async fn missing_entrypoint_fails_before_spawning() {
    let p = project("echo started; exec sleep 30", false).await;

    let err = p.supervisor.start_backend().await.unwrap_err();
    assert!(matches!(err, DevError::EntrypointNotFound { .. }));
    assert!(p.supervisor.backend_pid().await.is_none());
}

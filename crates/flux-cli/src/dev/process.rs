//! One supervised child: its PTY, output pump and exit watcher.
//!
//! Each child gets two OS threads. The reader splits PTY output into lines,
//! flags readiness and hands every line to the [`LogCapture`]. The reaper
//! blocks on the child and publishes its exit status. Async code observes
//! both through `watch` channels.

use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::time::Duration;

use portable_pty::MasterPty;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};

use super::platform::{self, SpawnSpec, Termination};
use super::{ports, ChildKind, ChildState, LogCapture};
use crate::error::DevError;

/// Substrings that mark a child as ready, matched case-insensitively.
pub const READINESS_TOKENS: &[&str] = &["listening", "running", "started", "://"];

const READY_POLL: Duration = Duration::from_millis(100);
const FORCE_GRACE: Duration = Duration::from_secs(2);

/// How a child was judged ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A readiness token appeared in its output.
    Token,
    /// Its port accepted a connection.
    PortBound,
    /// Still alive when the wait ran out.
    Optimistic,
}

/// Exit status published by the reaper thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<u32>,
    pub success: bool,
}

/// Whether `line` announces that a server is up.
pub fn is_ready_line(line: &str, banner: &str) -> bool {
    let lower = line.to_lowercase();
    READINESS_TOKENS.iter().any(|token| lower.contains(token))
        || (!banner.is_empty() && lower.contains(&banner.to_lowercase()))
}

pub struct ChildProcess {
    kind: ChildKind,
    command: String,
    port: u16,
    pid: u32,
    pgid: u32,
    state: ChildState,
    ready: watch::Receiver<bool>,
    exit: watch::Receiver<Option<ExitInfo>>,
    master: Option<Box<dyn MasterPty + Send>>,
}

impl ChildProcess {
    /// Spawn `spec` and start its reader and reaper threads.
    pub fn spawn(
        kind: ChildKind,
        spec: SpawnSpec,
        port: u16,
        banner: &str,
        capture: Arc<LogCapture>,
    ) -> Result<Self, DevError> {
        let isolated = platform::spawn_isolated(&spec)?;
        let (ready_tx, ready_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = watch::channel(None);

        let banner = banner.to_string();
        let reader = isolated.reader;
        std::thread::Builder::new()
            .name(format!("flux-{kind}-output"))
            .spawn(move || pump_output(kind, reader, &banner, &ready_tx, &capture))
            .map_err(|e| DevError::Spawn {
                name: kind.to_string(),
                message: format!("failed to start output thread: {e}"),
            })?;

        let mut child = isolated.child;
        let pid = isolated.pid;
        std::thread::Builder::new()
            .name(format!("flux-{kind}-reaper"))
            .spawn(move || {
                let info = match child.wait() {
                    Ok(status) => ExitInfo {
                        code: Some(status.exit_code()),
                        success: status.success(),
                    },
                    Err(e) => {
                        tracing::debug!(pid, error = %e, "wait failed");
                        ExitInfo {
                            code: None,
                            success: false,
                        }
                    }
                };
                let _ = exit_tx.send(Some(info));
            })
            .map_err(|e| DevError::Spawn {
                name: kind.to_string(),
                message: format!("failed to start reaper thread: {e}"),
            })?;

        Ok(Self {
            kind,
            command: spec.command,
            port,
            pid,
            pgid: isolated.pgid,
            state: ChildState::Starting,
            ready: ready_rx,
            exit: exit_rx,
            master: Some(isolated.master),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.exit_info().is_none()
    }

    /// Wait until the child is ready: a readiness token, a bound port, or
    /// still alive when `limit` runs out. Exiting first is an error.
    pub async fn wait_ready(&mut self, limit: Duration) -> Result<Readiness, DevError> {
        let deadline = Instant::now() + limit;
        loop {
            if *self.ready.borrow() {
                return Ok(self.mark_running(Readiness::Token));
            }
            if let Some(info) = self.exit_info() {
                self.state = ChildState::Stopped;
                return Err(DevError::ChildExitedEarly {
                    name: self.kind.to_string(),
                    code: info.code,
                });
            }
            if ports::is_bound_within(self.port, ports::FAST_PROBE_TIMEOUT).await {
                return Ok(self.mark_running(Readiness::PortBound));
            }
            if Instant::now() >= deadline {
                tracing::debug!(kind = %self.kind, "no readiness signal, assuming alive child is up");
                return Ok(self.mark_running(Readiness::Optimistic));
            }
            sleep(READY_POLL).await;
        }
    }

    fn mark_running(&mut self, how: Readiness) -> Readiness {
        self.state = ChildState::Running;
        how
    }

    /// Politely terminate the process group, escalate after `grace`, and
    /// wait for the reaper.
    pub async fn stop(&mut self, grace: Duration) {
        if self.state == ChildState::Stopped && !self.is_alive() {
            self.master.take();
            return;
        }
        self.state = ChildState::Stopping;

        if self.is_alive() {
            if let Err(e) =
                platform::terminate_tree_async(self.pid, self.pgid, Termination::Polite).await
            {
                tracing::debug!(pid = self.pid, error = %e, "polite terminate failed");
            }
            if !self.await_exit(grace).await {
                tracing::warn!(kind = %self.kind, pid = self.pid, "did not exit in time, killing");
                if let Err(e) =
                    platform::terminate_tree_async(self.pid, self.pgid, Termination::Forcible)
                        .await
                {
                    tracing::warn!(pid = self.pid, error = %e, "forcible terminate failed");
                }
                self.await_exit(FORCE_GRACE).await;
            }
        }

        // Closing the PTY ends the reader thread.
        self.master.take();
        self.state = ChildState::Stopped;
    }

    fn await_exit(&self, limit: Duration) -> impl std::future::Future<Output = bool> + Send + 'static {
        let mut exit = self.exit.clone();
        async move {
            let exited = matches!(
                timeout(limit, exit.wait_for(Option::is_some)).await,
                Ok(Ok(_))
            );
            exited
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            tracing::debug!(kind = %self.kind, pid = self.pid, "dropping live child, killing group");
            let _ = platform::terminate_tree(self.pid, self.pgid, Termination::Forcible);
        }
    }
}

fn pump_output(
    kind: ChildKind,
    reader: Box<dyn Read + Send>,
    banner: &str,
    ready: &watch::Sender<bool>,
    capture: &LogCapture,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']).replace('\r', "");
                if !*ready.borrow() && is_ready_line(&line, banner) {
                    let _ = ready.send(true);
                }
                capture.emit(kind, &line);
            }
            // EIO once the child side of the PTY is gone.
            Err(_) => break,
        }
    }
    tracing::debug!(%kind, "output closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_tokens_match_case_insensitively() {
        assert!(is_ready_line("Server LISTENING on :3002", "flux"));
        assert!(is_ready_line("  ➜  Local:   http://localhost:3001/", "flux"));
        assert!(is_ready_line("Started server process [4120]", ""));
        assert!(is_ready_line("app is Running", ""));
    }

    #[test]
    fn banner_marks_readiness() {
        assert!(is_ready_line("⚡ FLUX backend v0.3", "flux"));
        assert!(!is_ready_line("⚡ backend v0.3", "flux"));
    }

    #[test]
    fn ordinary_output_is_not_ready() {
        assert!(!is_ready_line("go: downloading github.com/go-chi/chi/v5 v5.0.12", "flux"));
        assert!(!is_ready_line("compiling...", ""));
        assert!(!is_ready_line("", ""));
    }
}

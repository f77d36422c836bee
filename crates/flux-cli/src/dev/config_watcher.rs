//! Live reload of `flux.yaml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use flux_config::{ConfigError, ProjectConfig, RestartReason, MANIFEST_FILE};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::restart::{RestartRequest, RestartSender};
use super::state::ConfigCell;
use super::Shutdown;
use crate::error::DevError;
use crate::ui;

/// Editors often write a file several times per save.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// The manifest did not load; the live config is untouched.
    Rejected(String),
    /// Published in place.
    Applied,
    /// Published, and the backend must restart to pick it up.
    RestartRequired(Vec<RestartReason>),
}

/// Publish a freshly loaded manifest and report what it takes to apply.
pub fn apply_manifest_change(
    cell: &ConfigCell,
    loaded: Result<ProjectConfig, ConfigError>,
) -> ReloadOutcome {
    let next = match loaded {
        Ok(next) => next,
        Err(e) => return ReloadOutcome::Rejected(e.to_string()),
    };
    let reasons = cell.get().restart_reasons(&next);
    cell.replace(next);
    if reasons.is_empty() {
        ReloadOutcome::Applied
    } else {
        ReloadOutcome::RestartRequired(reasons)
    }
}

/// Whether `event` is a write to the manifest.
pub fn is_manifest_write(event: &Event) -> bool {
    let writes = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    );
    writes
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == MANIFEST_FILE))
}

pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    pump: JoinHandle<()>,
}

impl ConfigWatcher {
    pub fn start(
        root: &Path,
        cell: Arc<ConfigCell>,
        restarts: RestartSender,
        shutdown: Shutdown,
    ) -> Result<Self, DevError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::NonRecursive)?;

        let pump = tokio::spawn(pump(rx, root.to_path_buf(), cell, restarts, shutdown));
        Ok(Self { watcher, pump })
    }

    pub fn close(self) {
        self.pump.abort();
        drop(self.watcher);
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    root: PathBuf,
    cell: Arc<ConfigCell>,
    restarts: RestartSender,
    shutdown: Shutdown,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            event = rx.recv() => match event {
                Some(Ok(event)) if is_manifest_write(&event) => {
                    deadline = Some(Instant::now() + RELOAD_DEBOUNCE);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => tracing::debug!(error = %e, "manifest watch error"),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                reload(&root, &cell, &restarts);
            }
        }
    }
}

fn reload(root: &Path, cell: &ConfigCell, restarts: &RestartSender) {
    match apply_manifest_change(cell, flux_config::load_from(root)) {
        ReloadOutcome::Rejected(message) => {
            ui::warning(&format!(
                "{MANIFEST_FILE} is invalid, keeping the current configuration\n   {message}"
            ));
        }
        ReloadOutcome::Applied => ui::success(&format!("Reloaded {MANIFEST_FILE}")),
        ReloadOutcome::RestartRequired(reasons) => {
            let fields: Vec<&str> = reasons.iter().map(RestartReason::field).collect();
            ui::info(&format!(
                "{MANIFEST_FILE} changed {}, restart required",
                fields.join(", ")
            ));
            if let Err(e) = restarts.try_send(RestartRequest::new(MANIFEST_FILE)) {
                tracing::debug!(error = %e, "restart queue rejected manifest change");
            }
        }
    }
}

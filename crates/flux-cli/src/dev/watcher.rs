//! Backend source watcher.
//!
//! Every directory under the configured source roots gets its own
//! non-recursive watch, skipping dependency, build and VCS directories and
//! the frontend tree. Directories created later are picked up as they
//! appear. Accepted changes become restart requests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use super::restart::{RestartRequest, RestartSender};
use super::Shutdown;
use crate::error::DevError;

/// Directory names that are never watched.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", "dist", "build", ".flux"];

/// Decides which directories to watch and which events count.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    extension: String,
    excluded_paths: Vec<PathBuf>,
}

impl WatchFilter {
    /// `frontend_dir` is excluded in addition to [`EXCLUDED_DIRS`].
    pub fn new(extension: &str, frontend_dir: PathBuf) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            excluded_paths: vec![frontend_dir],
        }
    }

    pub fn skips_dir(&self, dir: &Path) -> bool {
        let excluded_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
        excluded_name || self.excluded_paths.iter().any(|p| p == dir)
    }

    pub fn matches_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.extension)
    }

    /// Source files an event reports as created or rewritten.
    pub fn accepted_paths<'a>(&self, event: &'a Event) -> Vec<&'a Path> {
        let counts = matches!(
            event.kind,
            EventKind::Create(CreateKind::File | CreateKind::Any)
                | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
                | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        );
        if !counts {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| self.matches_file(p))
            .collect()
    }

    /// Directories under `root` to watch, depth first.
    pub fn directories(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || entry.depth() == 0 || !self.skips_dir(entry.path())
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect()
    }
}

/// Watches backend sources and feeds the restart queue.
pub struct SourceWatcher {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    pump: JoinHandle<()>,
    watched: usize,
}

impl SourceWatcher {
    pub fn start(
        root: &Path,
        source_roots: &[PathBuf],
        filter: WatchFilter,
        restarts: RestartSender,
        shutdown: Shutdown,
    ) -> Result<Self, DevError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        let watcher = Arc::new(Mutex::new(watcher));

        let mut seen = HashSet::new();
        for source_root in source_roots {
            let dir = root.join(source_root);
            if !dir.is_dir() {
                tracing::debug!(dir = %dir.display(), "source root missing, skipping");
                continue;
            }
            for dir in filter.directories(&dir) {
                if seen.insert(dir.clone()) {
                    watcher.lock().watch(&dir, RecursiveMode::NonRecursive)?;
                }
            }
        }
        let watched = seen.len();
        tracing::debug!(watched, "source watcher started");

        let pump = tokio::spawn(pump(
            rx,
            Arc::clone(&watcher),
            seen,
            root.to_path_buf(),
            filter,
            restarts,
            shutdown,
        ));

        Ok(Self {
            watcher,
            pump,
            watched,
        })
    }

    /// Number of directories watched at startup.
    pub fn watched(&self) -> usize {
        self.watched
    }

    /// Stop the pump and release the OS watches.
    pub fn close(self) {
        self.pump.abort();
        drop(self.watcher);
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watcher: Arc<Mutex<RecommendedWatcher>>,
    mut seen: HashSet<PathBuf>,
    root: PathBuf,
    filter: WatchFilter,
    restarts: RestartSender,
    shutdown: Shutdown,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.wait() => break,
            event = rx.recv() => match event {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "watch error");
                    continue;
                }
                None => break,
            },
        };

        if matches!(event.kind, EventKind::Create(_)) {
            for path in &event.paths {
                if path.is_dir() && !filter.skips_dir(path) {
                    for dir in filter.directories(path) {
                        if seen.insert(dir.clone()) {
                            if let Err(e) = watcher.lock().watch(&dir, RecursiveMode::NonRecursive) {
                                tracing::debug!(dir = %dir.display(), error = %e, "failed to watch new directory");
                            }
                        }
                    }
                }
            }
        }

        for path in filter.accepted_paths(&event) {
            let tag = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .display()
                .to_string();
            match restarts.try_send(RestartRequest::new(tag)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(req)) => {
                    tracing::debug!(tag = %req.tag, "restart queue full, dropping change");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }
}

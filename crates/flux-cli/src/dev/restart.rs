//! Restart coordination.
//!
//! Requests from the source and manifest watchers land in a bounded queue.
//! A single worker debounces them and spawns one restart cycle per quiet
//! period. Cycles are serialized by a flag rather than a held lock: a cycle
//! that finds another one running marks a follow-up and leaves, and the
//! running cycle requeues that follow-up when it finishes so the last edit
//! is always picked up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use super::Shutdown;
use crate::error::DevError;
use crate::ui;

/// Pending requests beyond this are dropped by the senders.
pub const QUEUE_CAPACITY: usize = 10;

/// Quiet period that must follow the last request before a cycle runs.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// How long a restarted backend gets to bind its port.
pub const BIND_TIMEOUT: Duration = Duration::from_secs(15);

/// Pause after the bind so initialization output lands in the replay.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// A request to restart the backend. `tag` names what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    pub tag: String,
}

impl RestartRequest {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

pub type RestartSender = mpsc::Sender<RestartRequest>;
pub type RestartReceiver = mpsc::Receiver<RestartRequest>;

pub fn channel() -> (RestartSender, RestartReceiver) {
    mpsc::channel(QUEUE_CAPACITY)
}

/// What a restart cycle drives.
#[async_trait]
pub trait RestartTarget: Send + Sync + 'static {
    /// Apply manifest changes that need more than a backend restart.
    async fn reconcile(&self);

    /// Open the log capture window.
    fn begin_capture(&self);

    async fn start_backend(&self) -> Result<(), DevError>;

    /// Wait until the backend port is bound. `false` on timeout.
    async fn await_backend(&self, limit: Duration) -> bool;

    /// Replay captured output and close the window.
    fn finish_capture(&self);

    /// Regenerate the API client.
    async fn regenerate(&self);
}

#[derive(Debug, Default)]
struct RestartState {
    is_restarting: bool,
    last_restart: Option<Instant>,
    follow_up: bool,
}

/// Start the restart worker. It runs until `shutdown` fires or every sender
/// is gone; cycles still running at that point are aborted.
pub fn spawn<T: RestartTarget>(
    target: Arc<T>,
    requeue: RestartSender,
    mut requests: RestartReceiver,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let state = Arc::new(Mutex::new(RestartState::default()));
        let mut cycles = JoinSet::new();
        let mut pending: Option<(String, Instant)> = None;

        loop {
            let deadline = pending.as_ref().map(|(_, at)| *at);
            tokio::select! {
                _ = shutdown.wait() => break,
                request = requests.recv() => match request {
                    Some(request) => {
                        tracing::debug!(tag = %request.tag, "restart requested");
                        pending = Some((request.tag, Instant::now() + DEBOUNCE));
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((tag, _)) = pending.take() {
                        cycles.spawn(run_cycle(
                            Arc::clone(&target),
                            Arc::clone(&state),
                            tag,
                            requeue.clone(),
                            shutdown.clone(),
                        ));
                    }
                }
                Some(_) = cycles.join_next(), if !cycles.is_empty() => {}
            }
        }

        cycles.abort_all();
        while cycles.join_next().await.is_some() {}
        tracing::debug!("restart worker stopped");
    })
}

async fn run_cycle<T: RestartTarget>(
    target: Arc<T>,
    state: Arc<Mutex<RestartState>>,
    tag: String,
    requeue: RestartSender,
    shutdown: Shutdown,
) {
    {
        let mut state = state.lock();
        if state.is_restarting {
            state.follow_up = true;
            ui::info("Restart already in progress, queued another");
            return;
        }
        if let Some(previous) = state.last_restart {
            tracing::debug!(since = ?previous.elapsed(), "previous restart");
        }
        state.is_restarting = true;
        state.last_restart = Some(Instant::now());
    }

    let started = Instant::now();
    ui::info(&format!("{tag} changed, restarting backend..."));

    target.reconcile().await;
    if !shutdown.is_triggered() {
        target.begin_capture();
        match target.start_backend().await {
            Ok(()) => {
                let bound = target.await_backend(BIND_TIMEOUT).await;
                tokio::time::sleep(SETTLE_DELAY).await;
                target.finish_capture();
                let elapsed = ui::format_duration(started.elapsed());
                if bound {
                    ui::success(&format!("Backend restarted in {elapsed}"));
                    target.regenerate().await;
                } else {
                    ui::warning(&format!(
                        "Backend restarted in {elapsed} (port not bound), skipping type generation"
                    ));
                }
            }
            Err(err) => {
                target.finish_capture();
                ui::error(&format!("Backend restart failed: {err}"));
                ui::info("Waiting for the next change...");
            }
        }
    }

    let follow_up = {
        let mut state = state.lock();
        state.is_restarting = false;
        std::mem::take(&mut state.follow_up)
    };
    if follow_up && !shutdown.is_triggered() {
        if let Err(e) = requeue.try_send(RestartRequest::new(tag)) {
            tracing::debug!(error = %e, "could not queue follow-up restart");
        }
    }
}

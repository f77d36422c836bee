//! Orchestrator lifecycle: boot, steady state, shutdown.
//!
//! Boot order matters: ports are fixed first so every child and the proxy
//! agree on them, the frontend comes up before the backend, and the proxy
//! binds last so the first browser request finds both upstreams. Whatever
//! way [`Orchestrator::run`] leaves, the full shutdown sequence runs.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::config_watcher::ConfigWatcher;
use super::proxy::{ProxyHandle, DRAIN_TIMEOUT};
use super::restart::{self, RestartTarget};
use super::state::{ConfigCell, PortAssignment};
use super::supervisor::{Supervisor, STOP_TIMEOUT};
use super::typegen::{ClientGenerator, TypeRegenerator};
use super::watcher::{SourceWatcher, WatchFilter};
use super::{platform, ports, LogCapture, Shutdown};
use crate::error::DevError;
use crate::install;
use crate::scaffold::Scaffolder;
use crate::ui;

/// How long the frontend gets to bind its port during boot.
pub const FRONTEND_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// How long the proxy gets to accept connections.
pub const PROXY_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the restart worker gets to wind down.
const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Ports must be free this long after shutdown.
#[cfg(windows)]
pub const PORT_FREE_TIMEOUT: Duration = Duration::from_secs(15);
#[cfg(not(windows))]
pub const PORT_FREE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct DevOptions {
    /// Run dependency installs before starting the children.
    pub install: bool,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self { install: true }
    }
}

type ProxySlot = Arc<Mutex<Option<ProxyHandle>>>;

/// Everything created during boot that shutdown must tear down.
struct Services {
    ports: Arc<PortAssignment>,
    capture: Arc<LogCapture>,
    supervisor: Arc<Supervisor>,
    proxy: ProxySlot,
    source_watcher: Option<SourceWatcher>,
    config_watcher: Option<ConfigWatcher>,
    restart_worker: Option<JoinHandle<()>>,
}

pub struct Orchestrator {
    root: PathBuf,
    config: Arc<ConfigCell>,
    options: DevOptions,
    scaffolder: Arc<dyn Scaffolder>,
    generator: Arc<dyn ClientGenerator>,
    shutdown: Shutdown,
    stopped: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        root: PathBuf,
        config: flux_config::ProjectConfig,
        options: DevOptions,
        scaffolder: Arc<dyn Scaffolder>,
        generator: Arc<dyn ClientGenerator>,
    ) -> Self {
        Self {
            root,
            config: Arc::new(ConfigCell::new(config)),
            options,
            scaffolder,
            generator,
            shutdown: Shutdown::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Handle that stops the orchestrator when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Boot, serve until a shutdown signal arrives, then tear down.
    pub async fn run(&self) -> Result<(), DevError> {
        let started = Instant::now();
        let signals = spawn_signal_handler(self.shutdown.clone());

        let config = self.config.get();
        let ports = match PortAssignment::assign(config.port).await {
            Ok(ports) => Arc::new(ports),
            Err(e) => {
                signals.abort();
                return Err(e);
            }
        };
        let capture = Arc::new(LogCapture::new());
        let supervisor = Arc::new(Supervisor::new(
            self.root.clone(),
            Arc::clone(&self.config),
            Arc::clone(&ports),
            Arc::clone(&capture),
        ));
        let mut services = Services {
            ports,
            capture,
            supervisor,
            proxy: Arc::new(Mutex::new(None)),
            source_watcher: None,
            config_watcher: None,
            restart_worker: None,
        };

        let result = tokio::select! {
            result = self.boot(&mut services, started) => result,
            _ = self.shutdown.wait() => Ok(()),
        };
        self.stop(&mut services).await;
        signals.abort();
        result
    }

    async fn boot(&self, services: &mut Services, started: Instant) -> Result<(), DevError> {
        let config = self.config.get();
        let snapshot = services.ports.snapshot();
        tracing::debug!(?snapshot, "ports assigned");

        for port in [snapshot.proxy, snapshot.frontend, snapshot.backend] {
            let evicted = platform::scavenge_port(port).await;
            if evicted > 0 {
                ui::warning(&format!("Stopped {evicted} stale process(es) on port {port}"));
            }
        }
        if !ports::await_free(snapshot.proxy, Duration::from_secs(2)).await {
            return Err(DevError::PortUnavailable {
                port: snapshot.proxy,
            });
        }

        let frontend_dir = self.root.join(&config.frontend.dir);
        if !frontend_dir.exists() {
            let name = config.display_name(&self.root);
            ui::info(&format!(
                "No frontend found, creating {}",
                config.frontend.dir.display()
            ));
            let written = self.scaffolder.scaffold(&frontend_dir, &name)?;
            tracing::debug!(written, dir = %frontend_dir.display(), "frontend scaffolded");
        }

        if self.options.install {
            install::install_dependencies(&self.root, &config).await?;
        }

        services.supervisor.start_frontend().await?;
        self.await_frontend(services).await?;

        let target = Arc::new(DevTarget {
            config: Arc::clone(&self.config),
            ports: Arc::clone(&services.ports),
            capture: Arc::clone(&services.capture),
            supervisor: Arc::clone(&services.supervisor),
            proxy: Arc::clone(&services.proxy),
            regenerator: TypeRegenerator::new(
                self.root.clone(),
                Arc::clone(&self.config),
                Arc::clone(&self.generator),
            ),
            shutdown: self.shutdown.clone(),
        });

        let (tx, rx) = restart::channel();
        let filter = WatchFilter::new(&config.backend.extension, frontend_dir.clone());
        let watcher = SourceWatcher::start(
            &self.root,
            &config.backend.source_roots,
            filter,
            tx.clone(),
            self.shutdown.clone(),
        )?;
        tracing::debug!(dirs = watcher.watched(), "watching backend sources");
        services.source_watcher = Some(watcher);
        services.config_watcher = Some(ConfigWatcher::start(
            &self.root,
            Arc::clone(&self.config),
            tx.clone(),
            self.shutdown.clone(),
        )?);
        services.restart_worker = Some(restart::spawn(
            Arc::clone(&target),
            tx,
            rx,
            self.shutdown.clone(),
        ));

        target.regenerate().await;

        services.capture.start();
        let readiness = services.supervisor.start_backend().await;
        services.capture.finish();
        let readiness = readiness?;
        tracing::debug!(?readiness, "backend up");

        let proxy_port = services.ports.proxy();
        let proxy = ProxyHandle::start(
            proxy_port,
            Arc::clone(&services.ports),
            self.shutdown.clone(),
        )
        .await?;
        *services.proxy.lock().await = Some(proxy);
        if !ports::await_bound(proxy_port, PROXY_READY_TIMEOUT, &self.shutdown).await {
            ui::warning(&format!("Proxy on port {proxy_port} is not accepting connections yet"));
        }

        let snapshot = services.ports.snapshot();
        ui::print_urls(
            &config.display_name(&self.root),
            snapshot.proxy,
            snapshot.frontend,
            snapshot.backend,
            started.elapsed(),
        );

        self.shutdown.wait().await;
        Ok(())
    }

    /// Wait for the frontend port, failing early if the dev server dies.
    async fn await_frontend(&self, services: &Services) -> Result<(), DevError> {
        let port = services.ports.frontend();
        let deadline = Instant::now() + FRONTEND_READY_TIMEOUT;
        loop {
            if ports::is_bound_within(port, ports::FAST_PROBE_TIMEOUT).await {
                ui::success(&format!("Frontend ready on port {port}"));
                return Ok(());
            }
            if let Some(code) = services.supervisor.frontend_exit().await {
                return Err(DevError::ChildExitedEarly {
                    name: "frontend".to_string(),
                    code,
                });
            }
            if self.shutdown.is_triggered() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                ui::warning(&format!(
                    "Frontend did not bind port {port} within {}s, continuing",
                    FRONTEND_READY_TIMEOUT.as_secs()
                ));
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Tear everything down. Only the first call does anything.
    async fn stop(&self, services: &mut Services) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        ui::info("Shutting down...");
        self.shutdown.trigger();

        if let Some(watcher) = services.source_watcher.take() {
            watcher.close();
        }
        if let Some(watcher) = services.config_watcher.take() {
            watcher.close();
        }
        if let Some(worker) = services.restart_worker.take() {
            if tokio::time::timeout(WORKER_STOP_TIMEOUT, worker).await.is_err() {
                tracing::debug!("restart worker did not stop in time");
            }
        }

        services.supervisor.stop_backend(STOP_TIMEOUT).await;
        if let Some(proxy) = services.proxy.lock().await.take() {
            proxy.shutdown(DRAIN_TIMEOUT).await;
        }
        services.supervisor.stop_frontend(STOP_TIMEOUT).await;

        let snapshot = services.ports.snapshot();
        let ports = [snapshot.proxy, snapshot.frontend, snapshot.backend];
        for port in ports {
            platform::scavenge_port(port).await;
        }
        let (proxy, frontend, backend) = tokio::join!(
            ports::await_free(snapshot.proxy, PORT_FREE_TIMEOUT),
            ports::await_free(snapshot.frontend, PORT_FREE_TIMEOUT),
            ports::await_free(snapshot.backend, PORT_FREE_TIMEOUT),
        );
        for (port, free) in ports.into_iter().zip([proxy, frontend, backend]) {
            if !free {
                ui::warning(&format!("Port {port} is still in use"));
            }
        }
        ui::success("Stopped");
    }
}

/// What restart cycles act on.
struct DevTarget {
    config: Arc<ConfigCell>,
    ports: Arc<PortAssignment>,
    capture: Arc<LogCapture>,
    supervisor: Arc<Supervisor>,
    proxy: ProxySlot,
    regenerator: TypeRegenerator,
    shutdown: Shutdown,
}

impl DevTarget {
    async fn rebind_proxy(&self, next: u16) {
        let mut slot = self.proxy.lock().await;
        let previous = self.ports.proxy();
        if let Some(proxy) = slot.take() {
            proxy.shutdown(DRAIN_TIMEOUT).await;
        }

        // A busy `next` is left alone and the old port comes back below.
        self.ports.set_proxy(next);
        match ProxyHandle::start(next, Arc::clone(&self.ports), self.shutdown.clone()).await {
            Ok(proxy) => {
                *slot = Some(proxy);
                ui::success(&format!("Proxy moved to http://localhost:{next}"));
            }
            Err(e) => {
                ui::error(&e.to_string());
                self.ports.set_proxy(previous);
                match ProxyHandle::start(previous, Arc::clone(&self.ports), self.shutdown.clone())
                    .await
                {
                    Ok(proxy) => *slot = Some(proxy),
                    Err(e) => ui::error(&format!("Could not restore the proxy: {e}")),
                }
            }
        }
    }
}

#[async_trait]
impl RestartTarget for DevTarget {
    async fn reconcile(&self) {
        let config = self.config.get();

        if config.port != self.ports.proxy() {
            self.rebind_proxy(config.port).await;
        }

        let wanted = config.frontend.render_dev_cmd(self.ports.frontend());
        let running = self.supervisor.frontend_command().await;
        if running.as_deref() != Some(wanted.as_str()) {
            ui::info("Frontend command changed, restarting the dev server");
            if let Err(e) = self.supervisor.start_frontend().await {
                ui::error(&e.to_string());
            }
        }
    }

    fn begin_capture(&self) {
        self.capture.start();
    }

    async fn start_backend(&self) -> Result<(), DevError> {
        self.supervisor.start_backend().await.map(|_| ())
    }

    async fn await_backend(&self, limit: Duration) -> bool {
        ports::await_bound(self.ports.backend(), limit, &self.shutdown).await
    }

    fn finish_capture(&self) {
        self.capture.finish();
    }

    async fn regenerate(&self) {
        self.regenerator.run().await;
    }
}

/// Trigger `shutdown` on the first termination signal.
fn spawn_signal_handler(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let received = tokio::select! {
            received = wait_for_signal() => received,
            _ = shutdown.wait() => return,
        };
        match received {
            Ok(name) => {
                eprintln!();
                tracing::debug!(signal = name, "termination signal");
                shutdown.trigger();
            }
            Err(e) => tracing::warn!(error = %e, "could not install signal handlers"),
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut hangup = signal(SignalKind::hangup())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
        _ = hangup.recv() => "SIGHUP",
    };
    Ok(name)
}

#[cfg(windows)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}

//! Shared orchestrator state: the live manifest, port assignment and
//! child bookkeeping types.

use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use flux_config::ProjectConfig;
use parking_lot::RwLock;

use super::ports;
use crate::error::DevError;

/// The live manifest. Readers get a cheap snapshot; the config watcher is
/// the only writer.
#[derive(Debug)]
pub struct ConfigCell {
    current: RwLock<Arc<ProjectConfig>>,
}

impl ConfigCell {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn get(&self) -> Arc<ProjectConfig> {
        self.current.read().clone()
    }

    /// Publish `next`, returning the configuration it replaced.
    pub fn replace(&self, next: ProjectConfig) -> Arc<ProjectConfig> {
        std::mem::replace(&mut *self.current.write(), Arc::new(next))
    }
}

/// Ports in use by the proxy and both children, readable without locks.
#[derive(Debug)]
pub struct PortAssignment {
    proxy: AtomicU16,
    frontend: AtomicU16,
    backend: AtomicU16,
}

/// A consistent copy of the three ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSnapshot {
    pub proxy: u16,
    pub frontend: u16,
    pub backend: u16,
}

impl PortAssignment {
    pub fn new(proxy: u16, frontend: u16, backend: u16) -> Self {
        Self {
            proxy: AtomicU16::new(proxy),
            frontend: AtomicU16::new(frontend),
            backend: AtomicU16::new(backend),
        }
    }

    /// Probe upward from `proxy + 1` for two distinct free ports.
    pub async fn assign(proxy: u16) -> Result<Self, DevError> {
        let unavailable = |port: u16| DevError::PortUnavailable { port };

        let start = proxy.checked_add(1).ok_or(unavailable(proxy))?;
        let frontend = ports::find_free_excluding(start, &[proxy])
            .await
            .ok_or(unavailable(start))?;

        let start = frontend.checked_add(1).ok_or(unavailable(frontend))?;
        let backend = ports::find_free_excluding(start, &[proxy, frontend])
            .await
            .ok_or(unavailable(start))?;

        Ok(Self::new(proxy, frontend, backend))
    }

    pub fn proxy(&self) -> u16 {
        self.proxy.load(Ordering::Acquire)
    }

    pub fn frontend(&self) -> u16 {
        self.frontend.load(Ordering::Acquire)
    }

    pub fn backend(&self) -> u16 {
        self.backend.load(Ordering::Acquire)
    }

    pub fn set_proxy(&self, port: u16) {
        self.proxy.store(port, Ordering::Release);
    }

    pub fn set_frontend(&self, port: u16) {
        self.frontend.store(port, Ordering::Release);
    }

    pub fn set_backend(&self, port: u16) {
        self.backend.store(port, Ordering::Release);
    }

    pub fn snapshot(&self) -> PortSnapshot {
        PortSnapshot {
            proxy: self.proxy(),
            frontend: self.frontend(),
            backend: self.backend(),
        }
    }

    /// Pick a new backend port above the current one that collides with
    /// neither the proxy nor the frontend, and publish it.
    pub async fn rebind_backend(&self) -> Option<u16> {
        let current = self.backend();
        let next = ports::find_free_excluding(
            current.checked_add(1)?,
            &[self.proxy(), self.frontend(), current],
        )
        .await?;
        self.set_backend(next);
        Some(next)
    }
}

/// Which supervised child a record or log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Frontend,
    Backend,
}

impl ChildKind {
    /// Console tag printed before each output line.
    pub fn tag(&self) -> &'static str {
        match self {
            ChildKind::Frontend => "[F]",
            ChildKind::Backend => "[B]",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChildKind::Frontend => "frontend",
            ChildKind::Backend => "backend",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_cell_swaps_whole_snapshots() {
        let cell = ConfigCell::new(ProjectConfig::default());
        let before = cell.get();

        let mut next = ProjectConfig::default();
        next.port = 4000;
        let replaced = cell.replace(next);

        assert_eq!(replaced.port, 3000);
        assert_eq!(before.port, 3000);
        assert_eq!(cell.get().port, 4000);
    }

    #[test]
    fn snapshot_reflects_updates() {
        let ports = PortAssignment::new(3000, 3001, 3002);
        ports.set_backend(3010);
        assert_eq!(
            ports.snapshot(),
            PortSnapshot {
                proxy: 3000,
                frontend: 3001,
                backend: 3010,
            }
        );
    }

    #[tokio::test]
    async fn assign_hands_out_distinct_ports() {
        let listener = match tokio::net::TcpListener::bind(("127.0.0.1", 0)).await {
            Ok(listener) => listener,
            Err(_) => return,
        };
        let Ok(addr) = listener.local_addr() else {
            return;
        };
        let proxy = addr.port();
        if proxy > u16::MAX - 300 {
            return;
        }

        let ports = PortAssignment::assign(proxy).await.expect("ports");
        let snap = ports.snapshot();
        assert_eq!(snap.proxy, proxy);
        assert!(snap.frontend > proxy);
        assert!(snap.backend > snap.frontend);
    }

    #[tokio::test]
    async fn assign_at_the_top_of_the_range_fails_instead_of_colliding() {
        assert!(matches!(
            PortAssignment::assign(u16::MAX).await,
            Err(DevError::PortUnavailable { port: u16::MAX })
        ));

        match PortAssignment::assign(u16::MAX - 1).await {
            Ok(ports) => panic!("expected PortUnavailable, got {:?}", ports.snapshot()),
            Err(DevError::PortUnavailable { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rebind_backend_avoids_reserved_ports() {
        let listener = match tokio::net::TcpListener::bind(("127.0.0.1", 0)).await {
            Ok(listener) => listener,
            Err(_) => return,
        };
        let Ok(addr) = listener.local_addr() else {
            return;
        };
        let base = addr.port();
        if base > u16::MAX - 300 {
            return;
        }

        let ports = PortAssignment::new(base + 2, base + 1, base);
        let next = ports.rebind_backend().await.expect("next port");
        assert_ne!(next, base);
        assert_ne!(next, base + 1);
        assert_ne!(next, base + 2);
        assert_eq!(ports.backend(), next);
    }
}

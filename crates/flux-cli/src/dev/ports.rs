//! Port probing.
//!
//! A port counts as bound when a TCP connection to `localhost:<port>`
//! succeeds. Binding-based checks would miss servers listening only on the
//! IPv6 loopback, which is where many bundler dev servers end up.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

use super::Shutdown;

/// Default probe timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Probe timeout used inside polling loops.
pub const FAST_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Number of ports scanned before falling back.
pub const SCAN_WIDTH: u16 = 100;

/// Offset of the fallback port when the scan window is exhausted.
pub const FALLBACK_OFFSET: u16 = 1000;

const FREE_POLL: Duration = Duration::from_millis(50);
const BOUND_POLL: Duration = Duration::from_millis(100);

/// Whether something accepts connections on `port`.
pub async fn is_bound(port: u16) -> bool {
    is_bound_within(port, PROBE_TIMEOUT).await
}

pub async fn is_bound_within(port: u16, limit: Duration) -> bool {
    matches!(
        timeout(limit, TcpStream::connect(("localhost", port))).await,
        Ok(Ok(_))
    )
}

/// First port in `[start, start + 100)` nothing listens on.
pub async fn find_free(start: u16) -> Option<u16> {
    find_free_excluding(start, &[]).await
}

/// Like [`find_free`], skipping ports already handed out.
///
/// Falls back to `start + 1000` when the whole window is taken. Returns
/// `None` when neither the window nor the fallback yields a usable port,
/// which only happens at the top of the port range.
pub async fn find_free_excluding(start: u16, reserved: &[u16]) -> Option<u16> {
    let usable = |port: u16| port != 0 && !reserved.contains(&port);
    let end = start.saturating_add(SCAN_WIDTH - 1);
    for port in start..=end {
        if !usable(port) {
            continue;
        }
        if !is_bound_within(port, FAST_PROBE_TIMEOUT).await {
            return Some(port);
        }
    }
    let fallback = start.checked_add(FALLBACK_OFFSET).filter(|&port| usable(port));
    tracing::warn!(start, ?fallback, "no free port in scan window");
    fallback
}

/// Poll until `port` is unbound or `limit` elapses. Returns whether it is free.
pub async fn await_free(port: u16, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if !is_bound_within(port, FAST_PROBE_TIMEOUT).await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(FREE_POLL).await;
    }
}

/// Poll until `port` is bound, `limit` elapses or shutdown fires.
/// Returns whether the port became bound.
pub async fn await_bound(port: u16, limit: Duration, shutdown: &Shutdown) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if shutdown.is_triggered() {
            return false;
        }
        if is_bound_within(port, FAST_PROBE_TIMEOUT).await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::select! {
            _ = sleep(BOUND_POLL) => {}
            _ = shutdown.wait() => return false,
        }
    }
}

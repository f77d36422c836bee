use std::process::{Command, Stdio};

use super::{parse_netstat_listeners, taskkill_args, without_self, Termination};

/// `taskkill` the tree rooted at `pid`. Windows has no process groups here.
///
/// Blocks until `taskkill` exits; only for contexts that cannot await, such
/// as `Drop`.
pub fn terminate_tree(pid: u32, _pgid: u32, mode: Termination) -> std::io::Result<()> {
    tracing::debug!(pid, ?mode, "taskkill");
    // A non-zero status usually means the tree is already gone.
    Command::new("taskkill")
        .args(taskkill_args(pid, mode))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|_| ())
}

/// [`terminate_tree`] without blocking the runtime.
pub async fn terminate_tree_async(pid: u32, _pgid: u32, mode: Termination) -> std::io::Result<()> {
    tracing::debug!(pid, ?mode, "taskkill");
    tokio::process::Command::new("taskkill")
        .args(taskkill_args(pid, mode))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|_| ())
}

/// Force-kill whatever listens on `port`. Returns how many processes were hit.
pub async fn scavenge_port(port: u16) -> usize {
    let output = match tokio::process::Command::new("netstat")
        .args(["-ano", "-p", "TCP"])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(port, error = %e, "netstat unavailable, skipping scavenge");
            return 0;
        }
    };

    let pids = without_self(parse_netstat_listeners(
        &String::from_utf8_lossy(&output.stdout),
        port,
    ));
    let mut killed = 0;
    for pid in pids {
        match terminate_tree_async(pid, pid, Termination::Forcible).await {
            Ok(()) => killed += 1,
            Err(e) => tracing::warn!(port, pid, error = %e, "failed to kill stale listener"),
        }
    }
    killed
}

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use super::{parse_lsof_pids, without_self, Termination};

/// Signal the whole process group led by `pgid`. Already-gone groups are fine.
pub fn terminate_tree(pid: u32, pgid: u32, mode: Termination) -> std::io::Result<()> {
    let signal = match mode {
        Termination::Polite => Signal::SIGTERM,
        Termination::Forcible => Signal::SIGKILL,
    };
    let group = i32::try_from(pgid).unwrap_or(i32::MAX);

    tracing::debug!(pid, pgid, ?signal, "signalling process group");
    match kill(Pid::from_raw(-group), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Signalling never blocks, so this is [`terminate_tree`] as is.
pub async fn terminate_tree_async(pid: u32, pgid: u32, mode: Termination) -> std::io::Result<()> {
    terminate_tree(pid, pgid, mode)
}

/// SIGKILL whatever listens on `port`. Returns how many processes were hit.
pub async fn scavenge_port(port: u16) -> usize {
    let output = match tokio::process::Command::new("lsof")
        .args(["-nP", &format!("-iTCP:{port}"), "-sTCP:LISTEN", "-t"])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(port, error = %e, "lsof unavailable, skipping scavenge");
            return 0;
        }
    };

    let pids = without_self(parse_lsof_pids(&String::from_utf8_lossy(&output.stdout)));
    let mut killed = 0;
    for pid in pids {
        let Ok(raw) = i32::try_from(pid) else {
            continue;
        };
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => {
                tracing::debug!(port, pid, "killed stale listener");
                killed += 1;
            }
            Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(port, pid, error = %e, "failed to kill stale listener"),
        }
    }
    killed
}

//! Platform adapter: PTY spawning, process-tree termination and port
//! scavenging.
//!
//! Everything OS-specific the orchestrator needs goes through two
//! primitives, [`spawn_isolated`] and [`terminate_tree`], plus
//! [`scavenge_port`] for evicting stale listeners. The output parsers for
//! `lsof` and `netstat` are plain functions so they build and test on every
//! platform.

use std::io::Read;
use std::path::PathBuf;

use portable_pty::{Child, CommandBuilder, MasterPty, NativePtySystem, PtySize, PtySystem};

use crate::error::DevError;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as sys;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as sys;

pub use sys::{scavenge_port, terminate_tree, terminate_tree_async};

/// How hard to ask a process tree to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGTERM / `taskkill /T`
    Polite,
    /// SIGKILL / `taskkill /T /F`
    Forcible,
}

/// `taskkill` arguments for the tree rooted at `pid`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn taskkill_args(pid: u32, mode: Termination) -> Vec<String> {
    let mut args = vec!["/PID".to_string(), pid.to_string(), "/T".to_string()];
    if mode == Termination::Forcible {
        args.push("/F".to_string());
    }
    args
}

/// What to run and where.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Used in error messages.
    pub name: String,
    /// Shell command line, run through `sh -c` or `cmd /C`.
    pub command: String,
    pub cwd: PathBuf,
    /// Variables removed from the inherited environment before `env` is applied.
    pub env_remove: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// A child running under its own PTY and process group.
pub struct IsolatedChild {
    pub pid: u32,
    /// Process group (Unix). Equal to `pid`: the PTY child leads its session.
    pub pgid: u32,
    pub child: Box<dyn Child + Send + Sync>,
    pub reader: Box<dyn Read + Send>,
    /// Keeps the PTY open; dropping it hangs up the child's terminal.
    pub master: Box<dyn MasterPty + Send>,
}

/// Program and arguments that run `command` through the platform shell.
pub fn shell_invocation(command: &str) -> (&'static str, Vec<String>) {
    if cfg!(windows) {
        ("cmd", vec!["/C".to_string(), command.to_string()])
    } else {
        ("sh", vec!["-c".to_string(), command.to_string()])
    }
}

/// Spawn `spec` under a fresh PTY, isolated in its own process group.
pub fn spawn_isolated(spec: &SpawnSpec) -> Result<IsolatedChild, DevError> {
    let spawn_error = |message: String| DevError::Spawn {
        name: spec.name.clone(),
        message,
    };

    let pair = NativePtySystem::default()
        .openpty(PtySize {
            rows: 40,
            cols: 160,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| spawn_error(format!("failed to open pty: {e}")))?;

    let (program, args) = shell_invocation(&spec.command);
    let mut cmd = CommandBuilder::new(program);
    cmd.args(&args);
    cmd.cwd(&spec.cwd);
    for key in &spec.env_remove {
        cmd.env_remove(key);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| spawn_error(e.to_string()))?;
    // Only the child holds the slave side, so the reader sees EOF when it exits.
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| spawn_error(format!("failed to read pty: {e}")))?;

    let pid = child
        .process_id()
        .ok_or_else(|| spawn_error("child has no process id".to_string()))?;

    tracing::debug!(name = %spec.name, pid, command = %spec.command, "spawned");

    Ok(IsolatedChild {
        pid,
        pgid: pid,
        child,
        reader,
        master: pair.master,
    })
}

/// PIDs from `lsof -t` output, one per line.
pub fn parse_lsof_pids(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .filter(|pid| *pid != 0)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// PIDs of `netstat -ano -p TCP` rows listening on `port`.
///
/// Rows look like `TCP    0.0.0.0:3000    0.0.0.0:0    LISTENING    4120`.
pub fn parse_netstat_listeners(output: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{port}");
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 || !cols[0].eq_ignore_ascii_case("TCP") {
                return None;
            }
            if cols[3] != "LISTENING" || !cols[1].ends_with(&suffix) {
                return None;
            }
            cols[4].parse::<u32>().ok()
        })
        .filter(|pid| *pid != 0)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Drop our own PID from a scavenge list.
pub(crate) fn without_self(pids: Vec<u32>) -> Vec<u32> {
    let me = std::process::id();
    pids.into_iter().filter(|pid| *pid != me).collect()
}

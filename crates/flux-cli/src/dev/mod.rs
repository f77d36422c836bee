//! The `flux dev` orchestrator.
//!
//! Runs the frontend dev server and the backend side by side behind a
//! single-origin proxy:
//! - Port assignment and probing
//! - PTY-backed child supervision with process-group teardown
//! - `/api` routing to the backend, everything else to the frontend
//! - Backend restarts on source edits, debounced and serialized
//! - Live reload of `flux.yaml`
//! - API client regeneration after each restart

pub mod capture;
pub mod config_watcher;
pub mod lifecycle;
pub mod platform;
pub mod ports;
pub mod process;
pub mod proxy;
pub mod restart;
pub mod shell;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod typegen;
pub mod watcher;

pub use capture::{LogCapture, LogEntry};
pub use lifecycle::{DevOptions, Orchestrator};
pub use proxy::ProxyHandle;
pub use restart::{RestartRequest, RestartTarget};
pub use shutdown::Shutdown;
pub use state::{ChildKind, ChildState, ConfigCell, PortAssignment, PortSnapshot};
pub use supervisor::Supervisor;
pub use typegen::{ClientGenerator, CommandGenerator, TypeRegenerator};

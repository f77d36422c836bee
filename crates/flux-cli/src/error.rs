//! Error handling for the Flux CLI.
//!
//! The hierarchy mirrors the orchestrator's failure taxonomy:
//! - **Top-level errors** (`CliError`) are what commands return and what
//!   `main` renders through miette.
//! - **Orchestrator errors** (`DevError`) describe boot and supervision
//!   failures with enough context to act on.
//! - **Manifest errors** come from `flux_config::ConfigError` and convert
//!   automatically.
//!
//! # Example
//!
//! ```rust,no_run
//! use flux_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Run flux from inside a project directory")
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub use flux_config::ConfigError;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Manifest discovery, parsing or validation failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The dev orchestrator failed
    #[error(transparent)]
    Dev(#[from] DevError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Failures of the dev orchestrator.
#[derive(Debug, Error)]
pub enum DevError {
    /// A port the orchestrator needs is held by something it could not evict
    #[error("Port {port} is still in use\n\nHint: Stop the process listening on {port} or change 'port' in flux.yaml")]
    PortUnavailable { port: u16 },

    /// No backend entrypoint at either conventional location
    #[error("No backend entrypoint found in {}\n\nHint: Create main{ext} at the project root or cmd/server/main{ext}", .root.display())]
    EntrypointNotFound { root: PathBuf, ext: String },

    /// The PTY or the child process could not be created
    #[error("Failed to start {name}: {message}")]
    Spawn { name: String, message: String },

    /// The child exited before it became ready
    #[error("{name} exited before becoming ready ({})", exit_description(.code))]
    ChildExitedEarly { name: String, code: Option<u32> },

    /// A dependency install step failed
    #[error("Dependency install failed ({command}): {message}")]
    Install { command: String, message: String },

    /// The frontend directory could not be bootstrapped
    #[error("Failed to scaffold {}: {message}", .path.display())]
    Scaffold { path: PathBuf, message: String },

    /// The proxy listener could not be bound
    #[error("Failed to bind proxy on port {port}: {source}")]
    ProxyBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The OpenAPI spec command or the client generator failed
    #[error("Type generation failed: {0}")]
    Generator(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O errors raised while supervising
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_description(code: &Option<u32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into `CliError::FileNotFound` for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

mod miette;
pub use self::miette::cli_error_to_miette;

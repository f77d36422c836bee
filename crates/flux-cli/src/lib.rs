//! Flux CLI - single-origin dev orchestrator.
//!
//! `flux dev` runs a bundler-driven frontend and a backend side by side
//! behind one proxy port, restarts the backend when its sources change and
//! regenerates the typed API client after every restart.
//!
//! # Architecture
//!
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Tagged, colored console output
//! - [`dev`] - The orchestrator: supervision, proxy, watchers, restarts
//! - `install` - Dependency installation
//! - `scaffold` - Frontend bootstrap from embedded templates
//! - `commands` - CLI command implementations
//!
//! # Example
//!
//! ```rust
//! use flux_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod install;
pub mod logger;
pub mod scaffold;
pub mod ui;

pub use error::{CliError, ConfigError, DevError, Result, ResultExt};

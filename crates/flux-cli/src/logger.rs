//! Logging infrastructure for the Flux CLI.
//!
//! Internal diagnostics go through `tracing`; user-facing status lines go
//! through [`crate::ui`]. The subscriber writes to stderr so it never
//! interleaves with child output mid-line.
//!
//! # Example
//!
//! ```rust,no_run
//! use flux_cli::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false);
//!
//! info!("booting orchestrator");
//! debug!(port = 3000, "proxy port assigned");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used by `--debug`.
pub const DEBUG_FILTER: &str = "flux=debug,flux_cli=debug,flux_config=debug,tower_http=debug";

/// Filter used when neither `--debug` nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "flux=info,flux_cli=info,flux_config=warn";

/// Initialize the tracing subscriber.
///
/// The logging level is determined in this order:
/// 1. `--debug` flag: DEBUG for flux crates (also shows proxied requests)
/// 2. `RUST_LOG` environment variable: custom filter
/// 3. Default: INFO for flux crates
pub fn init_logger(debug: bool, no_color: bool) {
    let filter = if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    init_logger_with_filter(filter, no_color);
}

/// Initialize logger with a custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

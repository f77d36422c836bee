//! Miette diagnostic conversion for CLI errors.

use crate::error::{CliError, DevError};
use flux_config::ConfigError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Dev(e) => dev_error_to_miette(e),
        _ => miette::miette!("{}", err),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    match err {
        ConfigError::NotFound(_) => miette::miette!(
            help = "Run `flux dev` inside a Flux project or pass --cwd <DIR>",
            "{}",
            err
        ),
        ConfigError::Parse { .. } => miette::miette!(
            help = "Check flux.yaml syntax and field types",
            "{}",
            err
        ),
        _ => miette::miette!("Configuration error: {}", err),
    }
}

/// Convert DevError to miette Report
pub fn dev_error_to_miette(err: DevError) -> Report {
    match err {
        DevError::ChildExitedEarly { .. } => miette::miette!(
            help = "The child's own output above shows why it stopped",
            "{}",
            err
        ),
        DevError::Install { .. } => miette::miette!(
            help = "Re-run with --no-install to skip dependency installation",
            "{}",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}

//! Command-line interface definition for Flux.
//!
//! - `flux dev` - run the frontend, the backend and the single-origin proxy

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Flux - full-stack dev orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "flux",
    version,
    about = "Full-stack dev orchestrator",
    long_about = "Flux runs your frontend dev server and your backend side by side behind\n\
                  a single-origin proxy, restarting the backend when its sources change\n\
                  and regenerating the API client after every restart."
)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development environment
    ///
    /// Assigns ports, starts the frontend dev server and the backend, and
    /// serves both behind a proxy on the port from flux.yaml. Requests to
    /// /api go to the backend, everything else to the frontend.
    Dev(DevArgs),
}

#[derive(Args, Debug, Default)]
pub struct DevArgs {
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Start from this directory instead of the current one
    ///
    /// The project root is the nearest directory at or above it that
    /// contains flux.yaml.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Skip dependency installation
    #[arg(long)]
    pub no_install: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_defaults() {
        let cli = Cli::try_parse_from(["flux", "dev"]).unwrap();
        let Command::Dev(args) = cli.command;
        assert!(!args.debug);
        assert!(!args.no_install);
        assert!(args.cwd.is_none());
        assert!(!cli.no_color);
    }

    #[test]
    fn dev_flags() {
        let cli = Cli::try_parse_from([
            "flux",
            "dev",
            "--debug",
            "--no-install",
            "--cwd",
            "apps/shop",
            "--no-color",
        ])
        .unwrap();
        let Command::Dev(args) = cli.command;
        assert!(args.debug);
        assert!(args.no_install);
        assert_eq!(args.cwd, Some(PathBuf::from("apps/shop")));
        assert!(cli.no_color);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["flux", "build"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

//! Flux CLI entry point: argument parsing, logging and command dispatch.

use clap::Parser;
use flux_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let debug = match &args.command {
        cli::Command::Dev(dev_args) => dev_args.debug,
    };
    logger::init_logger(debug, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}

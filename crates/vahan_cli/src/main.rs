mod cli;
mod commands;
mod prompt;
mod settings;

use clap::Parser;
use log::LevelFilter;
use scrape_logging::{scrape_error, LogDestination, DEFAULT_LOG_FILE};

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    scrape_logging::initialize(LogDestination::Both(log_file), level);

    let config = settings::load(cli.config.as_deref(), &cli.overrides())?;
    let outcome = match &cli.command {
        Command::Scrape(args) => commands::scrape::run(config, args),
        Command::Reparse { dir } => commands::reparse::run(&config, dir.as_deref()),
        Command::Inspect => commands::inspect::run(&config),
    };
    if let Err(err) = &outcome {
        scrape_error!("{:#}", err);
    }
    outcome
}

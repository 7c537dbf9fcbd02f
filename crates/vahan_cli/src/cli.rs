use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::Overrides;

/// Scrape registration reports from the Vahan dashboard.
#[derive(Debug, Parser)]
#[command(name = "vahan", version, about)]
pub struct Cli {
    /// RON file with engine settings and page component ids.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for raw fragments, combined tables and CSVs.
    #[arg(long, global = true, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Report page URL.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log file, appended to.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select Y-axis, X-axis and year(s), then save every page of the table.
    Scrape(ScrapeArgs),
    /// Rebuild CSVs from saved responses.
    Reparse {
        /// Defaults to the output directory.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Show the forms, dropdowns and hidden inputs of the report page.
    Inspect,
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Y-axis label, e.g. "Vehicle Class".
    #[arg(long = "y", value_name = "LABEL")]
    pub y: Option<String>,

    /// X-axis label, e.g. "Month Wise".
    #[arg(long = "x", value_name = "LABEL")]
    pub x: Option<String>,

    /// One or more years; several years run as parallel jobs.
    #[arg(long = "year", value_name = "LABEL", num_args = 1..)]
    pub years: Vec<String>,

    /// Pick every dropdown from a numbered list.
    #[arg(long)]
    pub interactive: bool,

    /// Concurrent sessions when scraping several years.
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let workers = match &self.command {
            Command::Scrape(args) => args.workers,
            _ => None,
        };
        Overrides {
            output_dir: self.out.clone(),
            base_url: self.base_url.clone(),
            workers,
        }
    }
}

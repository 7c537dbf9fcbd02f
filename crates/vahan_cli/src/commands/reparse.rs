use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use vahan_engine::{reparse_directory, ReparseOptions, ScrapeConfig};

pub fn run(config: &ScrapeConfig, dir: Option<&Path>) -> anyhow::Result<()> {
    let dir = dir.unwrap_or(config.output_dir.as_path());
    let options = ReparseOptions {
        generated_utc: Utc::now().to_rfc3339(),
        ..ReparseOptions::default()
    };
    let summary = reparse_directory(dir, options)
        .with_context(|| format!("reparsing {}", dir.display()))?;

    for table in &summary.tables {
        println!(
            "{} -> {} ({} rows)",
            table.source_file,
            table.csv_path.display(),
            table.rows
        );
    }
    match &summary.aggregate_path {
        Some(path) => println!(
            "{} rows from {} file(s) aggregated into {}",
            summary.aggregate_rows,
            summary.files_scanned,
            path.display()
        ),
        None => println!("no tables found in {} file(s)", summary.files_scanned),
    }
    Ok(())
}

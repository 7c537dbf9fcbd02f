use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use scrape_logging::scrape_info;
use vahan_engine::ScrapeConfig;

/// Flag values that win over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub workers: Option<usize>,
}

/// Defaults, then the RON file if one was given, then flags.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<ScrapeConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config = parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
            scrape_info!("loaded config from {}", path.display());
            config
        }
        None => ScrapeConfig::default(),
    };
    apply(&mut config, overrides);
    Ok(config)
}

fn parse(text: &str) -> Result<ScrapeConfig, ron::error::SpannedError> {
    ron::from_str(text)
}

fn apply(config: &mut ScrapeConfig, overrides: &Overrides) {
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(url) = &overrides.base_url {
        config.base_url = url.clone();
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers.max(1);
    }
}

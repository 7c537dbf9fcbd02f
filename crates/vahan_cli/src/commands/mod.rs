pub mod inspect;
pub mod reparse;
pub mod scrape;

use anyhow::Context;
use tokio::runtime::Runtime;

fn runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

use anyhow::Context;
use vahan_engine::{
    inventory, parse_bootstrap, AjaxTransport, ReqwestTransport, ScrapeConfig, TransportError,
};

const SAMPLE_OPTIONS: usize = 5;

/// Load the report page once and print what the scraper relies on.
pub fn run(config: &ScrapeConfig) -> anyhow::Result<()> {
    let html = super::runtime()?
        .block_on(load(config))
        .context("loading the report page")?;
    println!("{} ({} bytes)", config.base_url, html.len());

    match parse_bootstrap(&html) {
        Ok(page) => println!(
            "form {} with view state ({} chars)",
            page.form_id,
            page.view_state.len()
        ),
        Err(err) => println!("bootstrap would fail: {err}"),
    }

    let inv = inventory(&html, SAMPLE_OPTIONS);
    println!("forms: {}", inv.forms.join(", "));
    println!("selects:");
    for select in &inv.selects {
        let sample: Vec<String> = select
            .sample
            .iter()
            .map(|o| format!("{}={}", o.value, o.label))
            .collect();
        println!(
            "  {} ({} options): {}",
            select.id,
            select.option_count,
            sample.join(" | ")
        );
    }
    println!("hidden inputs: {}", inv.hidden_inputs.join(", "));

    for input in config.layout.cascade_inputs() {
        if !inv.selects.iter().any(|s| s.id == input) {
            println!("warning: configured dropdown {input} not found on the page");
        }
    }
    Ok(())
}

async fn load(config: &ScrapeConfig) -> Result<String, TransportError> {
    ReqwestTransport::new(config)?.load().await
}

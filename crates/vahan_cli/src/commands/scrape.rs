use std::io;

use anyhow::{bail, Context};
use scrape_logging::{scrape_debug, scrape_warn};
use tokio_util::sync::CancellationToken;
use vahan_core::{Axis, SelectOption, SelectionRequest};
use vahan_engine::{
    EngineEvent, EngineHandle, ReqwestTransport, ScrapeConfig, ScrapeError, ScrapeSession,
    ScrapeSummary,
};

use crate::cli::ScrapeArgs;
use crate::prompt;

/// One year runs in the foreground with prompts for anything missing or
/// unmatched; several years run as engine jobs and need every label.
pub fn run(config: ScrapeConfig, args: &ScrapeArgs) -> anyhow::Result<()> {
    if args.years.len() > 1 && !args.interactive {
        return run_batch(config, args);
    }
    let summary = super::runtime()?.block_on(run_single(&config, args))?;
    print_summary(&summary);
    Ok(())
}

async fn run_single(config: &ScrapeConfig, args: &ScrapeArgs) -> anyhow::Result<ScrapeSummary> {
    let transport = ReqwestTransport::new(config)?;
    let mut session = ScrapeSession::bootstrap(&transport, config, CancellationToken::new())
        .await
        .context("loading the report page")?;

    for axis in Axis::ALL {
        let label = if args.interactive {
            None
        } else {
            label_for(args, axis)
        };
        let option = pick(&session, axis, label)?;
        session.select(axis, &option).await?;
    }
    let first_rows = session.refresh().await?.rows.len();
    scrape_debug!("first page holds {} rows", first_rows);
    session.paginate().await?;
    Ok(session.persist()?)
}

fn pick(
    session: &ScrapeSession<'_>,
    axis: Axis,
    label: Option<&str>,
) -> anyhow::Result<SelectOption> {
    if let Some(label) = label {
        match session.resolve(axis, label) {
            Ok(option) => return Ok(option),
            Err(ScrapeError::SelectionNotFound { .. }) => {
                scrape_warn!("no {} option matches {:?}", axis, label);
            }
            Err(err) => return Err(err.into()),
        }
    }
    prompt::choose(
        axis,
        session.options(axis),
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )
}

fn label_for(args: &ScrapeArgs, axis: Axis) -> Option<&str> {
    match axis {
        Axis::YAxis => args.y.as_deref(),
        Axis::XAxis => args.x.as_deref(),
        Axis::Year => args.years.first().map(String::as_str),
    }
}

fn run_batch(config: ScrapeConfig, args: &ScrapeArgs) -> anyhow::Result<()> {
    let (Some(y), Some(x)) = (args.y.as_deref(), args.x.as_deref()) else {
        bail!("--y and --x are required when scraping several years");
    };

    let engine = EngineHandle::new(config).context("starting scrape engine")?;
    for (job_id, year) in (1u64..).zip(&args.years) {
        engine.enqueue(job_id, SelectionRequest::new(y, x, year.as_str()));
    }

    let mut pending = args.years.len();
    let mut failed = 0;
    while pending > 0 {
        let Some(event) = engine.recv() else {
            bail!("engine stopped with {pending} job(s) outstanding");
        };
        match event {
            EngineEvent::Progress(progress) => {
                scrape_debug!("job {} {}", progress.job_id, progress.stage);
            }
            EngineEvent::JobCompleted { job_id, result } => {
                pending -= 1;
                match result {
                    Ok(summary) => print_summary(&summary),
                    Err(err) => {
                        failed += 1;
                        let year = usize::try_from(job_id - 1)
                            .ok()
                            .and_then(|i| args.years.get(i))
                            .map_or("?", String::as_str);
                        eprintln!("{year}: {err}");
                    }
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} job(s) failed", args.years.len());
    }
    Ok(())
}

fn print_summary(summary: &ScrapeSummary) {
    let selection = &summary.selection;
    println!(
        "{} | {} | {}: {} rows over {} page(s) ({:?})",
        selection.y.label,
        selection.x.label,
        selection.year.label,
        summary.rows,
        summary.pages_fetched,
        summary.stop_reason
    );
    println!("  raw fragment: {}", summary.artifacts.raw_fragment.display());
    if let Some(path) = &summary.artifacts.combined_html {
        println!("  combined html: {}", path.display());
    }
    if let Some(path) = &summary.artifacts.csv {
        println!("  csv: {}", path.display());
    }
}

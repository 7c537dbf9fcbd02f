use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scrape_logging::{scrape_error, scrape_info, scrape_warn};
use tokio_util::sync::CancellationToken;

use crate::types::ScrapeError;

pub type Row = Vec<String>;

static ROW_COUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\browCount\s*:\s*(\d+)").ok());
static PAGE_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\brows\s*:\s*(\d+)").ok());

/// Row count and page size as announced by the table widget's client-side
/// initialization script. Either may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationMeta {
    pub total_rows: Option<u64>,
    pub page_size: Option<u64>,
}

/// Scrape `rowCount:N` and `rows:N` out of the widget configuration embedded
/// in the fragment. This is the only place that knows that format.
pub fn extract_pagination_meta(fragment: &str) -> PaginationMeta {
    PaginationMeta {
        total_rows: first_number(&ROW_COUNT, fragment),
        page_size: first_number(&PAGE_SIZE, fragment),
    }
}

fn first_number(pattern: &Option<Regex>, haystack: &str) -> Option<u64> {
    pattern
        .as_ref()?
        .captures(haystack)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Fetches one page of body rows. `page_index` is zero-based; page 0 is the
/// first page, which the driver already holds.
#[async_trait::async_trait]
pub trait PageSource: Send {
    async fn fetch_page(&mut self, page_index: usize, page_size: usize)
        -> Result<Vec<Row>, ScrapeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No further pages were announced.
    SinglePage,
    /// Every announced page was fetched.
    Exhausted,
    EmptyPage { page: usize },
    ShortPage { page: usize },
    FetchFailed { page: usize },
    ProbeCap,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Upper bound on pages probed when the total row count is unknown.
    pub max_probe_pages: usize,
    pub page_delay: Duration,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            max_probe_pages: 500,
            page_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub rows: Vec<Row>,
    /// Pages held, the first page included.
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
}

/// Collect every page of a result table starting from its first page.
///
/// With both a row count and a page size the exact page count is fetched.
/// With only a page size, pages are probed until one comes back empty or
/// short, or the probe cap is hit. Any fetch failure or empty page ends
/// pagination without discarding rows already collected.
pub async fn collect_all_pages<S>(
    first_fragment: &str,
    first_rows: Vec<Row>,
    source: &mut S,
    settings: &PaginationSettings,
    cancel: &CancellationToken,
) -> PaginationOutcome
where
    S: PageSource + ?Sized,
{
    let meta = extract_pagination_meta(first_fragment);
    let mut outcome = PaginationOutcome {
        rows: first_rows,
        pages_fetched: 1,
        stop_reason: StopReason::SinglePage,
    };

    let page_size = match meta.page_size {
        Some(size) if size > 0 => size as usize,
        _ => return outcome,
    };

    match meta.total_rows {
        Some(total) if total as usize > outcome.rows.len() => {
            let total_pages = (total as usize).div_ceil(page_size);
            scrape_info!(
                "table announces {} rows, {} per page: fetching {} more page(s)",
                total,
                page_size,
                total_pages.saturating_sub(1)
            );
            outcome.stop_reason = StopReason::Exhausted;
            for page in 1..total_pages {
                match fetch_next(source, page, page_size, settings, cancel).await {
                    Ok(rows) if rows.is_empty() => {
                        scrape_warn!("page {}/{} came back empty", page + 1, total_pages);
                        outcome.stop_reason = StopReason::EmptyPage { page };
                        break;
                    }
                    Ok(rows) => {
                        outcome.rows.extend(rows);
                        outcome.pages_fetched += 1;
                    }
                    Err(reason) => {
                        outcome.stop_reason = reason;
                        break;
                    }
                }
            }
        }
        Some(_) => {}
        None if outcome.rows.len() < page_size => {
            outcome.stop_reason = StopReason::ShortPage { page: 0 };
        }
        None => {
            scrape_info!(
                "no row count announced; probing pages of {} (cap {})",
                page_size,
                settings.max_probe_pages
            );
            outcome.stop_reason = StopReason::ProbeCap;
            for page in 1..=settings.max_probe_pages {
                match fetch_next(source, page, page_size, settings, cancel).await {
                    Ok(rows) if rows.is_empty() => {
                        outcome.stop_reason = StopReason::EmptyPage { page };
                        break;
                    }
                    Ok(rows) => {
                        let short = rows.len() < page_size;
                        outcome.rows.extend(rows);
                        outcome.pages_fetched += 1;
                        if short {
                            outcome.stop_reason = StopReason::ShortPage { page };
                            break;
                        }
                    }
                    Err(reason) => {
                        outcome.stop_reason = reason;
                        break;
                    }
                }
            }
            if outcome.stop_reason == StopReason::ProbeCap {
                scrape_warn!(
                    "probe cap of {} pages reached; result may be incomplete",
                    settings.max_probe_pages
                );
            }
        }
    }

    scrape_info!(
        "collected {} rows over {} page(s) ({:?})",
        outcome.rows.len(),
        outcome.pages_fetched,
        outcome.stop_reason
    );
    outcome
}

/// Wait out the politeness delay, then fetch. Cancellation is honoured both
/// before and during the delay.
async fn fetch_next<S>(
    source: &mut S,
    page: usize,
    page_size: usize,
    settings: &PaginationSettings,
    cancel: &CancellationToken,
) -> Result<Vec<Row>, StopReason>
where
    S: PageSource + ?Sized,
{
    if cancel.is_cancelled() {
        scrape_warn!("pagination cancelled before page {}", page + 1);
        return Err(StopReason::Cancelled);
    }
    if page > 1 && !settings.page_delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => {
                scrape_warn!("pagination cancelled before page {}", page + 1);
                return Err(StopReason::Cancelled);
            }
            _ = tokio::time::sleep(settings.page_delay) => {}
        }
    }
    source.fetch_page(page, page_size).await.map_err(|err| {
        scrape_error!("pagination aborted at page {}: {}", page + 1, err);
        StopReason::FetchFailed { page }
    })
}

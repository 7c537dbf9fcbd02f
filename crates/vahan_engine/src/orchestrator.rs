use scrape_logging::{scrape_error, scrape_info};
use tokio_util::sync::CancellationToken;
use vahan_core::{
    match_option, Axis, ScrapeFlow, SelectOption, Selection, SelectionRequest, SessionState, Stage,
    Step,
};

use crate::config::{PortalLayout, ScrapeConfig};
use crate::document::{discard_placeholders, parse_bootstrap, select_options};
use crate::envelope::PartialResponse;
use crate::progress::ProgressSink;
use crate::pagination::{
    collect_all_pages, PageSource, PaginationOutcome, PaginationSettings, Row, StopReason,
};
use crate::persist::{write_scrape_artifacts, AtomicFileWriter, ScrapeResult};
use crate::table::{parse_body_rows, parse_table, TableFragment};
use crate::transport::{AjaxRequest, AjaxTransport};
use crate::types::{EngineEvent, JobId, JobProgress, ProtocolError, ScrapeError, ScrapeSummary};

#[derive(Debug, Clone, Default)]
struct AxisOptions {
    y: Vec<SelectOption>,
    x: Vec<SelectOption>,
    year: Vec<SelectOption>,
}

impl AxisOptions {
    fn get(&self, axis: Axis) -> &[SelectOption] {
        match axis {
            Axis::YAxis => &self.y,
            Axis::XAxis => &self.x,
            Axis::Year => &self.year,
        }
    }

    fn set(&mut self, axis: Axis, options: Vec<SelectOption>) {
        match axis {
            Axis::YAxis => self.y = options,
            Axis::XAxis => self.x = options,
            Axis::Year => self.year = options,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Chosen {
    y: Option<SelectOption>,
    x: Option<SelectOption>,
    year: Option<SelectOption>,
}

#[derive(Debug, Clone)]
struct FirstPage {
    fragment: String,
    table: TableFragment,
}

/// One server-side session against the report page.
///
/// Steps must run in order: select Y, X and year, refresh, paginate,
/// persist. Each selection is committed to the session only after its
/// exchange succeeded, so a failed step leaves the previous state intact.
pub struct ScrapeSession<'a> {
    transport: &'a dyn AjaxTransport,
    config: &'a ScrapeConfig,
    cancel: CancellationToken,
    state: SessionState,
    flow: ScrapeFlow,
    options: AxisOptions,
    chosen: Chosen,
    first_page: Option<FirstPage>,
    collected: Option<PaginationOutcome>,
}

impl<'a> ScrapeSession<'a> {
    /// Load the report page, pick up the view state and form, and discover
    /// the dropdown options.
    pub async fn bootstrap(
        transport: &'a dyn AjaxTransport,
        config: &'a ScrapeConfig,
        cancel: CancellationToken,
    ) -> Result<Self, ScrapeError> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        let html = transport.load().await?;
        let page = parse_bootstrap(&html).inspect_err(|err| {
            scrape_error!("bootstrap failed: {}", err);
        })?;
        let layout = &config.layout;

        let mut options = AxisOptions::default();
        for axis in Axis::ALL {
            let select_id = PortalLayout::input_name(component(layout, axis));
            options.set(
                axis,
                discard_placeholders(axis, select_options(&page.html, &select_id)),
            );
        }
        scrape_info!(
            "bootstrapped form {} with {} y / {} x / {} year options",
            page.form_id,
            options.y.len(),
            options.x.len(),
            options.year.len()
        );

        let state = SessionState::new(page.view_state, page.form_id)
            .with_cascade(layout.cascade_inputs())
            .with_fields(layout.seed_fields.iter().cloned());

        Ok(Self {
            transport,
            config,
            cancel,
            state,
            flow: ScrapeFlow::new(),
            options,
            chosen: Chosen::default(),
            first_page: None,
            collected: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.flow.stage()
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    /// Current options for a dropdown. Downstream dropdowns reflect the
    /// server's repopulation after an upstream selection when it sent one.
    pub fn options(&self, axis: Axis) -> &[SelectOption] {
        self.options.get(axis)
    }

    /// Match an operator label against the current options of `axis`.
    pub fn resolve(&self, axis: Axis, label: &str) -> Result<SelectOption, ScrapeError> {
        let options = self.options(axis);
        if options.is_empty() {
            return Err(ProtocolError::NoOptions(axis).into());
        }
        match_option(label, options)
            .cloned()
            .ok_or_else(|| ScrapeError::SelectionNotFound {
                axis,
                label: label.to_string(),
            })
    }

    /// Select an option on one of the cascading dropdowns.
    pub async fn select(&mut self, axis: Axis, option: &SelectOption) -> Result<Stage, ScrapeError> {
        let step = match axis {
            Axis::YAxis => Step::SelectY,
            Axis::XAxis => Step::SelectX,
            Axis::Year => Step::SelectYear,
        };
        self.flow.check(step)?;
        self.ensure_not_cancelled()?;

        let config = self.config;
        let layout = &config.layout;
        let source = component(layout, axis);
        let render = match axis {
            Axis::YAxis => layout.x_axis.as_str(),
            Axis::XAxis => layout.x_axis_render.as_str(),
            Axis::Year => layout.year_render.as_str(),
        };

        let mut next = self.state.clone();
        next.set_field(PortalLayout::input_name(source), option.value.clone());
        let request = AjaxRequest::new(source, source, render);
        let envelope = self.send(&mut next, &request).await?;
        self.state = next;

        match axis {
            Axis::YAxis => {
                self.chosen = Chosen {
                    y: Some(option.clone()),
                    ..Chosen::default()
                };
                self.refresh_options(&envelope, render, Axis::XAxis);
            }
            Axis::XAxis => {
                self.chosen.x = Some(option.clone());
                self.chosen.year = None;
                self.refresh_options(&envelope, render, Axis::Year);
            }
            Axis::Year => self.chosen.year = Some(option.clone()),
        }

        let stage = self.flow.apply(step)?;
        scrape_info!("{} set to {}", axis, option);
        Ok(stage)
    }

    /// Ask the server to rebuild the result table for the current selection
    /// and keep its first page.
    pub async fn refresh(&mut self) -> Result<&TableFragment, ScrapeError> {
        self.flow.check(Step::Refresh)?;
        self.ensure_not_cancelled()?;

        let config = self.config;
        let layout = &config.layout;
        let render = format!(
            "{} {} {}",
            layout.table_panel, layout.table, layout.message_area
        );
        let request = AjaxRequest::new(layout.refresh_button.as_str(), "@all", render)
            .with_field(layout.refresh_button.as_str(), layout.refresh_button.as_str())
            .with_field(format!("{}_scrollState", layout.table), "0,0");

        let mut next = self.state.clone();
        let envelope = self.send(&mut next, &request).await?;
        self.state = next;

        let candidates = [layout.table_panel.as_str(), layout.table.as_str()];
        let (fragment_id, fragment) =
            envelope
                .first_fragment(&candidates)
                .ok_or_else(|| ProtocolError::MissingFragment {
                    ids: candidates.join(" "),
                    source_id: request.source.clone(),
                })?;
        let table = parse_table(fragment);
        scrape_info!(
            "first page from {}: {} columns, {} rows",
            fragment_id,
            table.headers.len(),
            table.rows.len()
        );

        self.flow.apply(Step::Refresh)?;
        let first = self.first_page.insert(FirstPage {
            fragment: fragment.to_string(),
            table,
        });
        Ok(&first.table)
    }

    /// Fetch the remaining pages. Page failures end pagination but keep the
    /// rows gathered so far; cancellation aborts the scrape.
    pub async fn paginate(&mut self) -> Result<&PaginationOutcome, ScrapeError> {
        self.flow.check(Step::Paginate)?;
        let first = self
            .first_page
            .as_ref()
            .ok_or(ScrapeError::Flow(vahan_core::FlowError {
                stage: self.flow.stage(),
                step: Step::Paginate,
            }))?;

        let config = self.config;
        let settings = PaginationSettings {
            max_probe_pages: config.max_probe_pages,
            page_delay: config.page_delay(),
        };
        let mut pager = TablePager {
            transport: self.transport,
            state: &mut self.state,
            table_id: config.layout.table.as_str(),
        };
        let outcome = collect_all_pages(
            &first.fragment,
            first.table.rows.clone(),
            &mut pager,
            &settings,
            &self.cancel,
        )
        .await;

        if outcome.stop_reason == StopReason::Cancelled {
            return Err(ScrapeError::Cancelled);
        }
        self.flow.apply(Step::Paginate)?;
        Ok(self.collected.insert(outcome))
    }

    /// Write the raw fragment, combined document and CSV.
    pub fn persist(&mut self) -> Result<ScrapeSummary, ScrapeError> {
        self.flow.check(Step::Persist)?;
        let out_of_order = || {
            ScrapeError::Flow(vahan_core::FlowError {
                stage: self.flow.stage(),
                step: Step::Persist,
            })
        };
        let selection = self.selection().ok_or_else(out_of_order)?;
        let first = self.first_page.as_ref().ok_or_else(out_of_order)?;
        let collected = self.collected.as_ref().ok_or_else(out_of_order)?;

        let result = ScrapeResult {
            selection: selection.clone(),
            table: TableFragment::new(first.table.headers.clone(), collected.rows.clone())
                .normalized(),
            raw_fragment: first.fragment.clone(),
        };
        let writer = AtomicFileWriter::new(self.config.output_dir.clone());
        let artifacts = write_scrape_artifacts(&writer, &result)?;
        self.flow.apply(Step::Persist)?;

        Ok(ScrapeSummary {
            selection,
            headers: result.table.headers,
            rows: result.table.rows.len(),
            pages_fetched: collected.pages_fetched,
            stop_reason: collected.stop_reason,
            artifacts,
        })
    }

    /// Resolve labels and drive every step to completion.
    pub async fn run(
        &mut self,
        request: &SelectionRequest,
        job_id: JobId,
        sink: &dyn ProgressSink,
    ) -> Result<ScrapeSummary, ScrapeError> {
        let result = self.run_steps(request, job_id, sink).await;
        if let Err(err) = &result {
            scrape_error!(
                "scrape {} | {} | {} aborted while {}: {}",
                request.y_label,
                request.x_label,
                request.year_label,
                self.stage(),
                err
            );
        }
        result
    }

    async fn run_steps(
        &mut self,
        request: &SelectionRequest,
        job_id: JobId,
        sink: &dyn ProgressSink,
    ) -> Result<ScrapeSummary, ScrapeError> {
        let emit = |stage: Stage, rows: Option<usize>| {
            sink.emit(EngineEvent::Progress(JobProgress {
                job_id,
                stage,
                rows,
            }));
        };
        emit(self.stage(), None);

        for axis in Axis::ALL {
            let option = self.resolve(axis, request.label(axis))?;
            let stage = self.select(axis, &option).await?;
            emit(stage, None);
        }
        let first_rows = self.refresh().await?.rows.len();
        emit(Stage::Refreshed, Some(first_rows));
        let total_rows = self.paginate().await?.rows.len();
        emit(Stage::Paginated, Some(total_rows));
        let summary = self.persist()?;
        emit(Stage::Persisted, Some(summary.rows));
        Ok(summary)
    }

    fn selection(&self) -> Option<Selection> {
        Some(Selection {
            y: self.chosen.y.clone()?,
            x: self.chosen.x.clone()?,
            year: self.chosen.year.clone()?,
        })
    }

    fn ensure_not_cancelled(&self) -> Result<(), ScrapeError> {
        if self.cancel.is_cancelled() {
            Err(ScrapeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Exchange against `next`, applying the refreshed view state to it.
    async fn send(
        &self,
        next: &mut SessionState,
        request: &AjaxRequest,
    ) -> Result<PartialResponse, ScrapeError> {
        let response = self.transport.exchange(next, request).await?;
        check_envelope(&response.envelope)?;
        next.apply_view_state(response.view_state);
        Ok(response.envelope)
    }

    fn refresh_options(&mut self, envelope: &PartialResponse, render_id: &str, downstream: Axis) {
        let Some(fragment) = envelope.extract_fragment(render_id) else {
            return;
        };
        let config = self.config;
        let select_id = PortalLayout::input_name(component(&config.layout, downstream));
        let refreshed = discard_placeholders(downstream, select_options(fragment, &select_id));
        if !refreshed.is_empty() {
            scrape_info!("{} repopulated with {} options", downstream, refreshed.len());
            self.options.set(downstream, refreshed);
        }
    }
}

fn component(layout: &PortalLayout, axis: Axis) -> &str {
    match axis {
        Axis::YAxis => &layout.y_axis,
        Axis::XAxis => &layout.x_axis,
        Axis::Year => &layout.year,
    }
}

fn check_envelope(envelope: &PartialResponse) -> Result<(), ProtocolError> {
    if let Some(fault) = &envelope.fault {
        return Err(ProtocolError::ServerError {
            name: fault.name.clone(),
            message: fault.message.clone(),
        });
    }
    if let Some(url) = &envelope.redirect {
        return Err(ProtocolError::Redirected { url: url.clone() });
    }
    Ok(())
}

/// Page fetches scoped to the result table only.
struct TablePager<'s> {
    transport: &'s dyn AjaxTransport,
    state: &'s mut SessionState,
    table_id: &'s str,
}

#[async_trait::async_trait]
impl PageSource for TablePager<'_> {
    async fn fetch_page(
        &mut self,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<Row>, ScrapeError> {
        let table = self.table_id;
        let request = AjaxRequest::new(table, table, table)
            .with_field(table, table)
            .with_field(format!("{table}_pagination"), "true")
            .with_field(format!("{table}_first"), (page_index * page_size).to_string())
            .with_field(format!("{table}_rows"), page_size.to_string())
            .with_field(format!("{table}_skipChildren"), "true")
            .with_field(format!("{table}_encodeFeature"), "true")
            .with_field(format!("{table}_scrollState"), "0,0");

        let response = self.transport.exchange(self.state, &request).await?;
        check_envelope(&response.envelope)?;
        self.state.apply_view_state(response.view_state);
        Ok(response
            .envelope
            .extract_fragment(table)
            .map(parse_body_rows)
            .unwrap_or_default())
    }
}

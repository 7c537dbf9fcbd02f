//! Vahan engine: the stateful AJAX session, result-table extraction and
//! artifact persistence.
mod config;
mod decode;
mod document;
mod engine;
mod envelope;
mod filename;
mod orchestrator;
mod pagination;
mod persist;
mod progress;
mod reparse;
mod table;
mod transport;
mod types;

pub use config::{PortalLayout, RetryPolicy, ScrapeConfig, DEFAULT_BASE_URL};
pub use decode::{decode_body, DecodedBody};
pub use document::{
    discard_placeholders, inventory, parse_bootstrap, select_options, BootstrapPage,
    PageInventory, SelectSummary,
};
pub use engine::EngineHandle;
pub use envelope::{
    is_view_state_id, parse_partial_response, EnvelopeError, PartialResponse, ServerFault, Update,
};
pub use filename::{all_pages_filename, raw_fragment_filename, sanitize_part, ALL_PAGES_TAG};
pub use orchestrator::ScrapeSession;
pub use pagination::{
    collect_all_pages, extract_pagination_meta, PageSource, PaginationMeta, PaginationOutcome,
    PaginationSettings, Row, StopReason,
};
pub use persist::{
    encode_csv, ensure_output_dir, write_scrape_artifacts, ArtifactPaths, AtomicFileWriter,
    PersistError, ScrapeResult,
};
pub use progress::{ChannelProgressSink, NullProgressSink, ProgressSink};
pub use reparse::{reparse_directory, ReparseError, ReparseOptions, ReparseSummary, ReparsedTable};
pub use table::{clean_cell_text, parse_body_rows, parse_table, render_table_html, TableFragment};
pub use transport::{
    encode_form_body, AjaxRequest, AjaxResponse, AjaxTransport, ReqwestTransport,
};
pub use types::{
    AttemptError, EngineEvent, FailureKind, JobId, JobProgress, ProtocolError, ScrapeError,
    ScrapeSummary, TransportError,
};

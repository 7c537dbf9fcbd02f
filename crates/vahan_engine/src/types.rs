use std::fmt;

use vahan_core::{Axis, FlowError, Selection, Stage};

use crate::pagination::StopReason;
use crate::persist::{ArtifactPaths, PersistError};

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
    pub rows: Option<usize>,
}

#[derive(Debug)]
pub enum EngineEvent {
    Progress(JobProgress),
    JobCompleted {
        job_id: JobId,
        result: Result<ScrapeSummary, ScrapeError>,
    },
}

/// What a finished scrape reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub selection: Selection,
    pub headers: Vec<String>,
    pub rows: usize,
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
    pub artifacts: ArtifactPaths,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    ClientSetup,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedEnvelope,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::ClientSetup => write!(f, "http client setup failed"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedEnvelope => write!(f, "malformed partial response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// A single attempt failure, before the retry policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Network/HTTP failure that survived every retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_id}: {kind} after {attempts} attempt(s): {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub source_id: String,
    pub attempts: u32,
    pub message: String,
}

impl TransportError {
    pub(crate) fn exhausted(source_id: &str, attempts: u32, last: AttemptError) -> Self {
        Self {
            kind: last.kind,
            source_id: source_id.to_string(),
            attempts,
            message: last.message,
        }
    }

    pub(crate) fn setup(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: String::new(),
            attempts: 0,
            message: message.into(),
        }
    }
}

/// The page no longer exposes something the protocol depends on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("view-state input not found in bootstrap document")]
    MissingViewState,
    #[error("no form with an id found in bootstrap document")]
    MissingForm,
    #[error("no options found for {0} dropdown")]
    NoOptions(Axis),
    #[error("partial response has no fragment for [{ids}] (source {source_id})")]
    MissingFragment { ids: String, source_id: String },
    #[error("server error {name}: {message}")]
    ServerError { name: String, message: String },
    #[error("server redirected to {url}; the view has probably expired")]
    Redirected { url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("out-of-order step: {0}")]
    Flow(#[from] FlowError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("no {axis} option matches label {label:?}")]
    SelectionNotFound { axis: Axis, label: String },
    #[error("cancelled")]
    Cancelled,
}

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use scrape_logging::{scrape_info, scrape_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use vahan_core::SelectionRequest;

use crate::config::ScrapeConfig;
use crate::orchestrator::ScrapeSession;
use crate::progress::{ChannelProgressSink, ProgressSink};
use crate::transport::ReqwestTransport;
use crate::types::{EngineEvent, JobId, ScrapeError, ScrapeSummary};

enum EngineCommand {
    Enqueue {
        job_id: JobId,
        request: SelectionRequest,
    },
    Stop {
        immediate: bool,
    },
}

/// Runs scrape jobs on a background runtime, each job in its own session.
///
/// At most `workers` sessions run at once. Every enqueued job produces
/// exactly one `JobCompleted` event, including jobs refused after a stop.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

#[derive(Clone)]
struct JobContext {
    config: Arc<ScrapeConfig>,
    gate: Arc<Semaphore>,
    accepting: Arc<AtomicBool>,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: ScrapeConfig) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let workers = config.workers.max(1);
        let context = JobContext {
            config: Arc::new(config),
            gate: Arc::new(Semaphore::new(workers)),
            accepting: Arc::new(AtomicBool::new(true)),
            cancel: CancellationToken::new(),
            event_tx,
        };

        thread::spawn(move || {
            let mut jobs = JoinSet::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Enqueue { job_id, request } => {
                        let context = context.clone();
                        jobs.spawn_on(run_job(context, job_id, request), runtime.handle());
                    }
                    EngineCommand::Stop { immediate } => {
                        scrape_info!("engine stopping (immediate: {})", immediate);
                        context.accepting.store(false, Ordering::SeqCst);
                        if immediate {
                            context.cancel.cancel();
                        }
                    }
                }
                while jobs.try_join_next().is_some() {}
            }
            runtime.block_on(async { while jobs.join_next().await.is_some() {} });
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn enqueue(&self, job_id: JobId, request: SelectionRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Enqueue { job_id, request });
    }

    /// Refuse jobs that have not started yet. With `immediate`, running
    /// sessions are cancelled too.
    pub fn stop(&self, immediate: bool) {
        let _ = self.cmd_tx.send(EngineCommand::Stop { immediate });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event, or `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn run_job(context: JobContext, job_id: JobId, request: SelectionRequest) {
    let sink = ChannelProgressSink::new(context.event_tx.clone());
    let result = tokio::select! {
        _ = context.cancel.cancelled() => Err(ScrapeError::Cancelled),
        result = scrape_one(&context, job_id, &request, &sink) => result,
    };
    if let Err(err) = &result {
        scrape_warn!("job {} failed: {}", job_id, err);
    }
    let _ = context
        .event_tx
        .send(EngineEvent::JobCompleted { job_id, result });
}

async fn scrape_one(
    context: &JobContext,
    job_id: JobId,
    request: &SelectionRequest,
    sink: &dyn ProgressSink,
) -> Result<ScrapeSummary, ScrapeError> {
    let _permit = context
        .gate
        .acquire()
        .await
        .map_err(|_| ScrapeError::Cancelled)?;
    if !context.accepting.load(Ordering::SeqCst) {
        return Err(ScrapeError::Cancelled);
    }

    scrape_info!(
        "job {} starting: {} | {} | {}",
        job_id,
        request.y_label,
        request.x_label,
        request.year_label
    );
    let transport = ReqwestTransport::new(&context.config)?;
    let mut session =
        ScrapeSession::bootstrap(&transport, &context.config, context.cancel.clone()).await?;
    session.run(request, job_id, sink).await
}

//! Background document ingestion.
//!
//! `IngestionPipeline::ingest` marks the target [`DocumentSlot`] as
//! processing before returning, then extracts, splits, and indexes the
//! document on a spawned task. The outcome is only ever observable through
//! the slot: the task never returns an error to the uploader.
//!
//! Cancellation abandons the outcome at once, but extraction runs on the
//! blocking pool and is not interrupted; it finishes in the background and
//! its result is discarded. The binary bounds how long shutdown waits for
//! such stragglers.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use docent_core::error::DocentError;
use docent_core::types::IngestionStatus;
use docent_extract::ExtractorChain;

use crate::index::{IndexBuilder, RetrievalIndex};

/// Cause recorded when ingestion is interrupted by shutdown.
pub const CANCELLED_MESSAGE: &str = "Ingestion cancelled";

#[derive(Default)]
struct SlotState {
    status: IngestionStatus,
    index: Option<Arc<dyn RetrievalIndex>>,
    generation: u64,
}

/// A session's document state: its ingestion status and, once an
/// ingestion has succeeded, the retrieval index.
///
/// Status and index are read and written together under one lock, so a
/// reader never sees `Ready` without the index that goes with it.
#[derive(Default)]
pub struct DocumentSlot {
    state: RwLock<SlotState>,
}

impl DocumentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write replaces whole fields, so a poisoned guard still holds a
    // consistent state.
    fn read(&self) -> RwLockReadGuard<'_, SlotState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> IngestionStatus {
        self.read().status.clone()
    }

    /// The current index, if any ingestion has ever succeeded.
    pub fn index(&self) -> Option<Arc<dyn RetrievalIndex>> {
        self.read().index.clone()
    }

    /// Status and index read atomically.
    pub fn snapshot(&self) -> (IngestionStatus, Option<Arc<dyn RetrievalIndex>>) {
        let state = self.read();
        (state.status.clone(), state.index.clone())
    }

    /// Enter the processing state, returning the generation that owns it.
    fn begin(&self) -> Result<u64, DocentError> {
        let mut state = self.write();
        if state.status.is_processing() {
            return Err(DocentError::Busy);
        }
        state.status = IngestionStatus::Processing;
        state.generation += 1;
        Ok(state.generation)
    }

    /// Record the outcome of the ingestion identified by `generation`.
    ///
    /// Success replaces the index and marks the slot ready. Failure records
    /// the cause and leaves any previous index untouched. Outcomes from a
    /// superseded generation are dropped.
    fn complete(&self, generation: u64, outcome: Result<Arc<dyn RetrievalIndex>, String>) {
        let mut state = self.write();
        if state.generation != generation {
            warn!(generation, current = state.generation, "Dropping stale ingestion outcome");
            return;
        }
        match outcome {
            Ok(index) => {
                state.index = Some(index);
                state.status = IngestionStatus::Ready;
            }
            Err(cause) => {
                state.status = IngestionStatus::Error(cause);
            }
        }
    }
}

/// Handle to a running ingestion task.
pub struct IngestionHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl IngestionHandle {
    /// Request cancellation. The slot ends in the error state.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the outcome has been written to the slot.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Ingestion task aborted");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Runs extraction and index building off the caller's path.
#[derive(Clone)]
pub struct IngestionPipeline {
    chain: Arc<ExtractorChain>,
    builder: Arc<dyn IndexBuilder>,
    shutdown: CancellationToken,
}

impl IngestionPipeline {
    /// Create a pipeline. Cancelling `shutdown` cancels every ingestion
    /// started from this pipeline.
    pub fn new(
        chain: ExtractorChain,
        builder: Arc<dyn IndexBuilder>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            chain: Arc::new(chain),
            builder,
            shutdown,
        }
    }

    /// Start ingesting `data` into `slot`.
    ///
    /// The slot is `Processing` when this returns. Returns `Busy` if the
    /// slot is already processing and `ShuttingDown` once shutdown has
    /// begun. Must be called from within a Tokio runtime.
    pub fn ingest(
        &self,
        session_id: Uuid,
        slot: Arc<DocumentSlot>,
        data: Vec<u8>,
    ) -> Result<IngestionHandle, DocentError> {
        if self.shutdown.is_cancelled() {
            return Err(DocentError::ShuttingDown);
        }
        let generation = slot.begin()?;
        info!(%session_id, bytes = data.len(), generation, "Document ingestion started");

        let cancel = self.shutdown.child_token();
        let token = cancel.clone();
        let chain = Arc::clone(&self.chain);
        let builder = Arc::clone(&self.builder);

        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => Err(CANCELLED_MESSAGE.to_string()),
                result = run(chain, builder, data) => result.map_err(failure_cause),
            };
            match &outcome {
                Ok(index) => info!(%session_id, chunks = index.len(), "Document ready"),
                Err(cause) => warn!(%session_id, cause = %cause, "Document ingestion failed"),
            }
            slot.complete(generation, outcome);
        });

        Ok(IngestionHandle { task, cancel })
    }
}

async fn run(
    chain: Arc<ExtractorChain>,
    builder: Arc<dyn IndexBuilder>,
    data: Vec<u8>,
) -> Result<Arc<dyn RetrievalIndex>, DocentError> {
    let chunks = tokio::task::spawn_blocking(move || chain.extract(&data))
        .await
        .map_err(|e| DocentError::Extraction(format!("Extraction task failed: {}", e)))??;
    builder.build(chunks).await
}

/// Human-readable cause stored in the slot.
fn failure_cause(err: DocentError) -> String {
    match err {
        DocentError::Extraction(msg) => msg,
        DocentError::IndexBuild(msg) => format!("Failed to build the document index: {}", msg),
        other => other.to_string(),
    }
}

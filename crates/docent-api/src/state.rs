//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use docent_chat::{ConversationOrchestrator, SessionRegistry};
use docent_core::config::DocentConfig;
use docent_vector::IngestionPipeline;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Per-session
/// synchronization lives inside the registry's sessions.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (read-only at runtime).
    pub config: Arc<DocentConfig>,
    /// Live sessions keyed by session id.
    pub sessions: Arc<SessionRegistry>,
    /// Routes and answers chat turns.
    pub orchestrator: Arc<ConversationOrchestrator>,
    /// Background document ingestion.
    pub pipeline: Arc<IngestionPipeline>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: DocentConfig,
        orchestrator: ConversationOrchestrator,
        pipeline: IngestionPipeline,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new()),
            orchestrator: Arc::new(orchestrator),
            pipeline: Arc::new(pipeline),
            start_time: Instant::now(),
        }
    }
}

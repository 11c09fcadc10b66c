//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use docent_core::error::DocentError;

use crate::handlers;
use crate::state::AppState;

/// Body limit for every route except `/upload`.
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Room for multipart boundaries and part headers on top of the file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .upload
        .max_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/pdf_status", get(handlers::pdf_status))
        .route("/chat", post(handlers::chat))
        .route("/clear", post(handlers::clear))
        .route("/history", get(handlers::history))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` is cancelled.
pub async fn start_server(
    addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), DocentError> {
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

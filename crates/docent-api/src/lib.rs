//! Docent API crate - axum HTTP server and route handlers.
//!
//! Provides the upload, ingestion status, chat, clear, history, and health
//! endpoints over the shared session registry.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;

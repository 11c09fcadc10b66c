//! Route handler functions for all API endpoints.
//!
//! Every handler resolves the caller's session from the `x-session-id`
//! header (creating one when the header is absent) and echoes the id back
//! in the same header.

use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use docent_chat::Session;
use docent_core::error::DocentError;
use docent_core::types::{ContextKind, IngestionStatus, Turn};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the opaque session token.
pub const SESSION_HEADER: &str = "x-session-id";

pub const UPLOAD_ACCEPTED_MESSAGE: &str = "PDF uploaded! Processing in background...";
pub const NO_FILE_MESSAGE: &str = "No file selected";
pub const INVALID_FILE_MESSAGE: &str = "Please upload a valid PDF file";
pub const EMPTY_FILE_MESSAGE: &str = "The uploaded file is empty";
pub const BUSY_MESSAGE: &str = "A PDF is already being processed. Please wait...";
pub const CLEARED_MESSAGE: &str = "Chat cleared";

/// A JSON body plus the session id response header.
pub type SessionJson<T> = ([(&'static str, String); 1], Json<T>);

fn with_session<T>(session: &Session, body: T) -> SessionJson<T> {
    ([(SESSION_HEADER, session.id().to_string())], Json(body))
}

/// Resolve the caller's session, creating it on first contact.
fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<Arc<Session>, ApiError> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(state.sessions.create()?);
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!("'{}' header must be a UUID", SESSION_HEADER))
        })?;
    Ok(state.sessions.get_or_create(id)?)
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ContextKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<Turn>,
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: u64,
}

// =============================================================================
// Upload
// =============================================================================

fn upload_rejected(session: &Session, message: impl Into<String>) -> SessionJson<UploadResponse> {
    with_session(
        session,
        UploadResponse {
            success: false,
            message: message.into(),
            filename: None,
            session_id: session.id(),
        },
    )
}

fn has_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

async fn discard_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Staged upload not removed");
    }
}

/// POST /upload - accept a PDF as multipart field `file` and start ingestion.
///
/// Returns as soon as ingestion has been started; progress is polled via
/// `/pdf_status`.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<SessionJson<UploadResponse>, ApiError> {
    let session = resolve_session(&state, &headers)?;
    let max_bytes = state.config.upload.max_bytes;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("Upload exceeds the {} byte limit", max_bytes))
        } else {
            ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
        }
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(format!("Upload exceeds the {} byte limit", max_bytes))
            } else {
                ApiError::BadRequest(format!("Failed to read file data: {}", e))
            }
        })?;
        file = Some((filename, data.to_vec()));
    }

    let Some((filename, data)) = file else {
        return Ok(upload_rejected(&session, NO_FILE_MESSAGE));
    };
    if filename.trim().is_empty() {
        return Ok(upload_rejected(&session, NO_FILE_MESSAGE));
    }
    if !has_allowed_extension(&filename, &state.config.upload.allowed_extensions) {
        return Ok(upload_rejected(&session, INVALID_FILE_MESSAGE));
    }
    if data.is_empty() {
        return Ok(upload_rejected(&session, EMPTY_FILE_MESSAGE));
    }
    if data.len() > max_bytes {
        let err = DocentError::PayloadTooLarge {
            size: data.len(),
            limit: max_bytes,
        };
        return Ok(upload_rejected(&session, err.to_string()));
    }
    if session.document().status().is_processing() {
        return Ok(upload_rejected(&session, BUSY_MESSAGE));
    }

    // Stage under a unique name; only an accepted upload replaces the
    // session's stored file.
    let upload_dir = state.config.upload_path();
    let path = upload_dir.join(format!("{}.pdf", session.id()));
    let staging = upload_dir.join(format!("{}.{}.part", session.id(), Uuid::new_v4()));
    let staged = async {
        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::write(&staging, &data).await
    }
    .await;
    if let Err(e) = staged {
        warn!(session_id = %session.id(), error = %e, "Failed to store upload");
        discard_staged(&staging).await;
        return Ok(upload_rejected(&session, format!("Error uploading PDF: {}", e)));
    }

    if let Err(e) = state
        .pipeline
        .ingest(session.id(), Arc::clone(session.document()), data)
    {
        discard_staged(&staging).await;
        return match e {
            DocentError::Busy => Ok(upload_rejected(&session, BUSY_MESSAGE)),
            other => Err(other.into()),
        };
    }

    if let Err(e) = tokio::fs::rename(&staging, &path).await {
        warn!(session_id = %session.id(), error = %e, "Failed to store upload");
        discard_staged(&staging).await;
    }

    info!(
        session_id = %session.id(),
        filename = %filename,
        path = %path.display(),
        "Upload accepted"
    );
    Ok(with_session(
        &session,
        UploadResponse {
            success: true,
            message: UPLOAD_ACCEPTED_MESSAGE.to_string(),
            filename: Some(filename),
            session_id: session.id(),
        },
    ))
}

// =============================================================================
// Status, chat, clear, history
// =============================================================================

/// GET /pdf_status - current ingestion status, with the cause on error.
pub async fn pdf_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<SessionJson<IngestionStatus>, ApiError> {
    let session = resolve_session(&state, &headers)?;
    let status = session.document().status();
    Ok(with_session(&session, status))
}

/// POST /chat - answer one message.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<SessionJson<ChatResponseBody>, ApiError> {
    let session = resolve_session(&state, &headers)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    match state.orchestrator.chat(&session, &request.message).await {
        Ok(reply) => Ok(with_session(
            &session,
            ChatResponseBody {
                success: true,
                response: Some(reply.response),
                messages: Some(reply.messages),
                target: Some(reply.target),
                message: None,
                session_id: session.id(),
            },
        )),
        Err(e) if e.is_rejection() => Ok(with_session(
            &session,
            ChatResponseBody {
                success: false,
                response: None,
                messages: None,
                target: None,
                message: Some(e.to_string()),
                session_id: session.id(),
            },
        )),
        Err(e) => Err(e.into()),
    }
}

/// POST /clear - truncate the session's conversation memory.
pub async fn clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<SessionJson<ClearResponse>, ApiError> {
    let session = resolve_session(&state, &headers)?;
    state.sessions.clear_memory(session.id()).await?;
    Ok(with_session(
        &session,
        ClearResponse {
            success: true,
            message: CLEARED_MESSAGE.to_string(),
        },
    ))
}

/// GET /history - the session's full conversation log.
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<SessionJson<HistoryResponse>, ApiError> {
    let session = resolve_session(&state, &headers)?;
    let messages = session.history().await;
    Ok(with_session(
        &session,
        HistoryResponse {
            messages,
            session_id: session.id(),
        },
    ))
}

/// GET /health - liveness and basic counters. Does not touch sessions.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.sessions.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extension_is_case_insensitive() {
        let allowed = vec!["pdf".to_string()];
        assert!(has_allowed_extension("report.pdf", &allowed));
        assert!(has_allowed_extension("REPORT.PDF", &allowed));
        assert!(has_allowed_extension("archive.v2.Pdf", &allowed));
        assert!(!has_allowed_extension("report.txt", &allowed));
        assert!(!has_allowed_extension("pdf", &allowed));
        assert!(!has_allowed_extension("report.pdf.exe", &allowed));
    }
}

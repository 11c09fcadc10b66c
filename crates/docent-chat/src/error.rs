//! Error types for the conversation layer.

use docent_core::error::DocentError;

/// Errors from the conversation layer.
///
/// The display strings of the rejection variants are shown to users as-is.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Empty message")]
    EmptyMessage,
    #[error("Message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("PDF is still processing. Please wait...")]
    StillProcessing,
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ChatError {
    /// True for rejections caused by the request itself rather than a
    /// server-side fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) | ChatError::StillProcessing
        )
    }
}

impl From<DocentError> for ChatError {
    fn from(err: DocentError) -> Self {
        match err {
            DocentError::EmptyInput => ChatError::EmptyMessage,
            other => ChatError::StorageError(other.to_string()),
        }
    }
}

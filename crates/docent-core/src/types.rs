use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which conversation context answers a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Facts shared earlier in the conversation; no retrieval.
    General,
    /// Grounded in passages retrieved from the uploaded document.
    Document,
}

// =============================================================================
// Documents
// =============================================================================

/// Current state of a session's document ingestion.
///
/// Only the current state is retained; there is no transition history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum IngestionStatus {
    #[default]
    None,
    Processing,
    Ready,
    Error(String),
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStatus::None => "none",
            IngestionStatus::Processing => "processing",
            IngestionStatus::Ready => "ready",
            IngestionStatus::Error(_) => "error",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, IngestionStatus::Processing)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, IngestionStatus::Ready)
    }

    /// The failure cause, when in the error state.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            IngestionStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// A piece of document text plus where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// True if the chunk carries no usable text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let json = serde_json::to_value(Turn::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");

        let json = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_turn_deserializes() {
        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(turn, Turn::assistant("ok"));
    }

    #[test]
    fn test_ingestion_status_default_is_none() {
        assert_eq!(IngestionStatus::default(), IngestionStatus::None);
        assert_eq!(IngestionStatus::default().as_str(), "none");
    }

    #[test]
    fn test_ingestion_status_error_message() {
        let status = IngestionStatus::Error("corrupted".to_string());
        assert_eq!(status.as_str(), "error");
        assert_eq!(status.error_message(), Some("corrupted"));
        assert_eq!(IngestionStatus::Ready.error_message(), None);
    }

    #[test]
    fn test_ingestion_status_serde_shape() {
        let json = serde_json::to_value(IngestionStatus::Error("bad".to_string())).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "bad");

        let json = serde_json::to_value(IngestionStatus::Processing).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_context_kind_serializes() {
        assert_eq!(
            serde_json::to_value(ContextKind::Document).unwrap(),
            serde_json::json!("document")
        );
    }

    #[test]
    fn test_chunk_is_blank() {
        assert!(DocumentChunk::new(" \n\t ", serde_json::json!({})).is_blank());
        assert!(!DocumentChunk::new("x", serde_json::json!({})).is_blank());
    }
}

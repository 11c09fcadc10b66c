use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DocentError, Result};

/// Top-level configuration for the Docent application.
///
/// Loaded from `~/.docent/config.toml` by default. Every section falls back
/// to its defaults, so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocentConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl DocentConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DocentConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DocentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(DocentError::Config(
                "ingest.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(DocentError::Config(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.upload.max_bytes == 0 {
            return Err(DocentError::Config(
                "upload.max_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory uploaded documents are written to.
    pub fn upload_path(&self) -> PathBuf {
        resolve_data_dir(&self.general.data_dir).join(&self.upload.upload_dir)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for uploaded documents.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.docent/data".to_string(),
            log_level: "info".to_string(),
            port: 5000,
        }
    }
}

/// Document upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes.
    pub max_bytes: usize,
    /// Accepted file extensions, lower-case, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Subdirectory of `data_dir` holding per-session uploads.
    pub upload_dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 16 * 1024 * 1024,
            allowed_extensions: vec!["pdf".to_string()],
            upload_dir: "files".to_string(),
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of most recent turns fed back as history.
    pub memory_window: usize,
    /// Number of document chunks retrieved per document-targeted turn.
    pub retrieval_k: usize,
    /// Maximum message length in characters.
    pub max_message_length: usize,
    /// Substrings that mark a message as document-related.
    pub document_keywords: Vec<String>,
    /// Reply recorded and returned when the answer generator fails.
    pub fallback_reply: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            memory_window: 10,
            retrieval_k: 3,
            max_message_length: 4000,
            document_keywords: DEFAULT_DOCUMENT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            fallback_reply: "I apologize, but I encountered an error. Please try again."
                .to_string(),
        }
    }
}

/// Keywords routing a message to the document context.
pub const DEFAULT_DOCUMENT_KEYWORDS: [&str; 7] =
    ["pdf", "document", "text", "file", "content", "page", "section"];

/// Language model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub chat_completions_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chat_completions_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4-1106-preview".to_string(),
            temperature: 0.7,
            timeout_ms: 30_000,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hash" (offline, deterministic) or "openai".
    pub provider: String,
    /// OpenAI-compatible embeddings endpoint.
    pub embeddings_url: String,
    /// Embedding model identifier.
    pub model: String,
    /// Vector dimension produced (hash) or requested (openai).
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            embeddings_url: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
        }
    }
}

/// Document splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DocentConfig::default();
        assert_eq!(config.general.data_dir, "~/.docent/data");
        assert_eq!(config.general.port, 5000);
        assert_eq!(config.upload.max_bytes, 16 * 1024 * 1024);
        assert_eq!(config.chat.memory_window, 10);
        assert_eq!(config.chat.retrieval_k, 3);
        assert_eq!(config.chat.document_keywords.len(), 7);
        assert_eq!(config.ingest.chunk_size, 4000);
        assert_eq!(config.ingest.chunk_overlap, 200);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"
port = 8080

[chat]
memory_window = 6
retrieval_k = 5

[llm]
model = "gpt-4o-mini"
"#;
        let file = create_temp_config(content);
        let config = DocentConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.chat.memory_window, 6);
        assert_eq!(config.chat.retrieval_k, 5);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        // Unset fields within a section keep their defaults.
        assert_eq!(config.chat.document_keywords.len(), 7);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[general]\nlog_level = \"warn\"\n");
        let config = DocentConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.chat.memory_window, 10);
        assert_eq!(config.embedding.provider, "hash");
    }

    #[test]
    fn test_load_rejects_overlap_not_smaller_than_chunk() {
        let file = create_temp_config("[ingest]\nchunk_size = 100\nchunk_overlap = 100\n");
        let result = DocentConfig::load(file.path());
        assert!(matches!(result, Err(DocentError::Config(_))));
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("invalid = [[[");
        assert!(matches!(
            DocentConfig::load(file.path()),
            Err(DocentError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DocentConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.docent/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DocentConfig::default();
        config.chat.retrieval_k = 7;
        config.save(&path).unwrap();

        let reloaded = DocentConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.retrieval_k, 7);
        assert_eq!(reloaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_resolve_data_dir_absolute_unchanged() {
        assert_eq!(resolve_data_dir("/srv/docent"), PathBuf::from("/srv/docent"));
    }

    #[test]
    fn test_upload_path_joins_upload_dir() {
        let mut config = DocentConfig::default();
        config.general.data_dir = "/srv/docent".to_string();
        assert_eq!(config.upload_path(), PathBuf::from("/srv/docent/files"));
    }
}

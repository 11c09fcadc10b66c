//! Docent extraction crate - text extractor trait, PDF backends, and splitting.
//!
//! Provides the `TextExtractor` trait, three PDF backends tried in a fixed
//! order by `ExtractorChain`, a `MockExtractor` for testing, and the
//! character splitter that turns page text into retrieval-sized chunks.

pub mod chain;
pub mod pdf;
pub mod splitter;

use docent_core::error::DocentError;
use docent_core::types::DocumentChunk;

pub use chain::ExtractorChain;
pub use pdf::{LopdfOperatorExtractor, LopdfTextExtractor, RawStreamExtractor};
pub use splitter::TextSplitter;

/// Service for turning raw document bytes into page-level text.
///
/// Implementations are synchronous and CPU-bound; callers run them on a
/// blocking thread. Each returned chunk is one page (or the closest unit the
/// backend can produce) with `page` and `source` metadata.
pub trait TextExtractor: Send + Sync {
    /// Short backend name used in logs and chunk metadata.
    fn name(&self) -> &'static str;

    /// Extract text from raw document bytes.
    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError>;
}

/// Mock extractor for testing.
///
/// Returns the configured pages for any non-empty input, or fails.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    pages: Vec<String>,
    fail: bool,
}

impl MockExtractor {
    /// Create a mock extractor that returns the given pages.
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            fail: false,
        }
    }

    /// Create a mock extractor that returns no text at all.
    pub fn empty() -> Self {
        Self {
            pages: Vec::new(),
            fail: false,
        }
    }

    /// Create a mock extractor that always fails.
    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
        }
    }
}

impl TextExtractor for MockExtractor {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError> {
        if self.fail {
            return Err(DocentError::Extraction("mock extractor failure".to_string()));
        }
        if data.is_empty() {
            return Err(DocentError::Extraction("Empty document data".to_string()));
        }
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                DocumentChunk::new(
                    text.clone(),
                    serde_json::json!({ "page": i + 1, "source": self.name() }),
                )
            })
            .collect())
    }
}

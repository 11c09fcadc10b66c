//! Ordered fallback across extraction backends.

use tracing::{debug, info, warn};

use docent_core::error::DocentError;
use docent_core::types::DocumentChunk;

use crate::pdf::{LopdfOperatorExtractor, LopdfTextExtractor, RawStreamExtractor};
use crate::splitter::TextSplitter;
use crate::TextExtractor;

/// Cause reported when no backend yields usable text.
pub const UNEXTRACTABLE_MESSAGE: &str = "Could not extract text from the PDF. \
     It may be a scanned image, password-protected, or corrupted.";

/// Tries each backend in order and returns the chunks of the first one that
/// produces at least one non-blank chunk.
pub struct ExtractorChain {
    backends: Vec<Box<dyn TextExtractor>>,
    splitter: TextSplitter,
}

impl ExtractorChain {
    /// Create a chain over the given backends, in the order given.
    pub fn new(backends: Vec<Box<dyn TextExtractor>>, splitter: TextSplitter) -> Self {
        Self { backends, splitter }
    }

    /// The standard PDF chain: lopdf text, lopdf operators, raw stream scan.
    pub fn pdf_default(splitter: TextSplitter) -> Self {
        Self::new(
            vec![
                Box::new(LopdfTextExtractor),
                Box::new(LopdfOperatorExtractor),
                Box::new(RawStreamExtractor),
            ],
            splitter,
        )
    }

    /// Backend names in the order they are tried.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Run the backends until one yields usable chunks.
    ///
    /// Empty results and failures both advance to the next backend. If every
    /// backend is exhausted the result is an `Extraction` error.
    pub fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError> {
        for backend in &self.backends {
            match backend.extract(data) {
                Ok(pages) => {
                    let chunks = self.splitter.split_pages(&pages);
                    if chunks.is_empty() {
                        debug!(backend = backend.name(), "Backend produced no usable text");
                        continue;
                    }
                    info!(
                        backend = backend.name(),
                        pages = pages.len(),
                        chunks = chunks.len(),
                        "Document text extracted"
                    );
                    return Ok(chunks);
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Extraction backend failed");
                }
            }
        }
        Err(DocentError::Extraction(UNEXTRACTABLE_MESSAGE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::build_pdf;
    use crate::MockExtractor;

    fn chain(backends: Vec<Box<dyn TextExtractor>>) -> ExtractorChain {
        ExtractorChain::new(backends, TextSplitter::new(100, 0))
    }

    #[test]
    fn test_first_successful_backend_wins() {
        let c = chain(vec![
            Box::new(MockExtractor::with_pages(&["from first"])),
            Box::new(MockExtractor::with_pages(&["from second"])),
        ]);
        let chunks = c.extract(b"data").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "from first");
    }

    #[test]
    fn test_failure_advances_to_next_backend() {
        let c = chain(vec![
            Box::new(MockExtractor::failing()),
            Box::new(MockExtractor::with_pages(&["recovered"])),
        ]);
        let chunks = c.extract(b"data").unwrap();
        assert_eq!(chunks[0].text, "recovered");
    }

    #[test]
    fn test_whitespace_only_result_advances() {
        let c = chain(vec![
            Box::new(MockExtractor::with_pages(&["   ", "\n\t"])),
            Box::new(MockExtractor::empty()),
            Box::new(MockExtractor::with_pages(&["third time lucky"])),
        ]);
        let chunks = c.extract(b"data").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "third time lucky");
    }

    #[test]
    fn test_all_backends_fail() {
        let c = chain(vec![
            Box::new(MockExtractor::failing()),
            Box::new(MockExtractor::empty()),
            Box::new(MockExtractor::failing()),
        ]);
        match c.extract(b"data") {
            Err(DocentError::Extraction(msg)) => {
                assert!(!msg.is_empty());
                assert!(msg.contains("scanned image"));
            }
            other => panic!("expected extraction error, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_pdf_default_order() {
        let c = ExtractorChain::pdf_default(TextSplitter::default());
        assert_eq!(
            c.backend_names(),
            vec!["lopdf_text", "lopdf_operators", "raw_stream"]
        );
    }

    #[test]
    fn test_pdf_default_extracts_real_pdf() {
        let c = ExtractorChain::pdf_default(TextSplitter::default());
        let chunks = c.extract(&build_pdf(&["Quarterly revenue grew", "Costs fell"])).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("Quarterly revenue grew"));
    }

    #[test]
    fn test_pdf_default_rejects_garbage() {
        let c = ExtractorChain::pdf_default(TextSplitter::default());
        assert!(matches!(
            c.extract(b"not a pdf at all"),
            Err(DocentError::Extraction(_))
        ));
    }
}

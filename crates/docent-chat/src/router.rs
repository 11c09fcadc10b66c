//! Per-message choice between the general and document contexts.

use tracing::debug;

use docent_core::config::DEFAULT_DOCUMENT_KEYWORDS;
use docent_core::types::{ContextKind, IngestionStatus};

/// Keyword heuristic routing a message to one of the two contexts.
///
/// A message goes to the document context only when the document is ready,
/// an index is present, and the lower-cased message contains one of the
/// keywords as a substring. There is no semantic classification.
#[derive(Debug, Clone)]
pub struct ContextRouter {
    keywords: Vec<String>,
}

impl ContextRouter {
    /// Create a router over the given keywords (matched case-insensitively).
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if the lower-cased message contains any keyword.
    pub fn matches_keyword(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Choose the context for a message.
    ///
    /// Callers must reject messages while ingestion is processing before
    /// calling this; a processing status routes to `General` here.
    pub fn route(
        &self,
        message: &str,
        status: &IngestionStatus,
        document_present: bool,
    ) -> ContextKind {
        let target = if document_present && status.is_ready() && self.matches_keyword(message) {
            ContextKind::Document
        } else {
            ContextKind::General
        };
        debug!(
            target = ?target,
            status = status.as_str(),
            document_present,
            "Message routed"
        );
        target
    }
}

impl Default for ContextRouter {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_document_routes_general() {
        let router = ContextRouter::default();
        assert_eq!(
            router.route("What is my name?", &IngestionStatus::None, false),
            ContextKind::General
        );
    }

    #[test]
    fn test_ready_document_with_keyword_routes_document() {
        let router = ContextRouter::default();
        assert_eq!(
            router.route("summarize the document", &IngestionStatus::Ready, true),
            ContextKind::Document
        );
    }

    #[test]
    fn test_flipping_any_condition_routes_general() {
        let router = ContextRouter::default();
        let msg = "what does page 2 say?";
        assert_eq!(router.route(msg, &IngestionStatus::Ready, true), ContextKind::Document);

        assert_eq!(router.route(msg, &IngestionStatus::Ready, false), ContextKind::General);
        assert_eq!(
            router.route(msg, &IngestionStatus::Error("bad".into()), true),
            ContextKind::General
        );
        assert_eq!(router.route(msg, &IngestionStatus::None, true), ContextKind::General);
        assert_eq!(
            router.route("what did I tell you earlier?", &IngestionStatus::Ready, true),
            ContextKind::General
        );
    }

    #[test]
    fn test_keyword_match_is_substring_and_case_insensitive() {
        let router = ContextRouter::default();
        // "texture" contains "text", "PAGES" contains "page".
        assert!(router.matches_keyword("I like the texture"));
        assert!(router.matches_keyword("How many PAGES are there"));
        assert!(router.matches_keyword("Summarize the PDF"));
        assert!(router.matches_keyword("in the contents"));
        assert!(!router.matches_keyword("My name is Ada"));
    }

    #[test]
    fn test_every_default_keyword_matches() {
        let router = ContextRouter::default();
        for keyword in DEFAULT_DOCUMENT_KEYWORDS {
            assert!(router.matches_keyword(&format!("about the {keyword} please")));
        }
        assert_eq!(router.keywords().len(), 7);
    }

    #[test]
    fn test_custom_keywords_are_normalized() {
        let router = ContextRouter::new([" Report ", "", "CHART"]);
        assert_eq!(router.keywords(), &["report".to_string(), "chart".to_string()]);
        assert!(router.matches_keyword("show the chart"));
        assert!(!router.matches_keyword("summarize the document"));
    }
}

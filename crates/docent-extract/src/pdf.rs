//! PDF text extraction backends.
//!
//! Three strategies of decreasing fidelity, tried in this order by
//! [`ExtractorChain::pdf_default`](crate::ExtractorChain::pdf_default):
//! 1. `LopdfTextExtractor` - lopdf's font-aware page text extraction
//! 2. `LopdfOperatorExtractor` - raw `Tj`/`TJ` operands from decoded content streams
//! 3. `RawStreamExtractor` - regex scan of the file bytes for text-showing operators

use std::sync::LazyLock;

use lopdf::content::Content;
use lopdf::{Document, Object};
use regex::Regex;
use tracing::debug;

use docent_core::error::DocentError;
use docent_core::types::DocumentChunk;

use crate::TextExtractor;

fn page_chunk(text: String, page: u32, source: &str) -> DocumentChunk {
    DocumentChunk::new(text, serde_json::json!({ "page": page, "source": source }))
}

fn load_document(data: &[u8]) -> Result<Document, DocentError> {
    if data.is_empty() {
        return Err(DocentError::Extraction("Empty document data".to_string()));
    }
    let doc = Document::load_mem(data)
        .map_err(|e| DocentError::Extraction(format!("Failed to parse PDF: {}", e)))?;
    if doc.is_encrypted() {
        return Err(DocentError::Extraction("PDF is password-protected".to_string()));
    }
    Ok(doc)
}

// ---------------------------------------------------------------------------
// LopdfTextExtractor
// ---------------------------------------------------------------------------

/// Page-by-page extraction using lopdf's encoding-aware text decoder.
#[derive(Debug, Clone, Default)]
pub struct LopdfTextExtractor;

impl TextExtractor for LopdfTextExtractor {
    fn name(&self) -> &'static str {
        "lopdf_text"
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError> {
        let doc = load_document(data)?;
        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push(page_chunk(text, *page_number, self.name())),
                Err(e) => debug!(page = page_number, error = %e, "Page text extraction failed"),
            }
        }
        Ok(pages)
    }
}

// ---------------------------------------------------------------------------
// LopdfOperatorExtractor
// ---------------------------------------------------------------------------

/// Collects string operands of text-showing operators from each page's
/// decoded content stream, ignoring font encodings.
#[derive(Debug, Clone, Default)]
pub struct LopdfOperatorExtractor;

impl TextExtractor for LopdfOperatorExtractor {
    fn name(&self) -> &'static str {
        "lopdf_operators"
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError> {
        let doc = load_document(data)?;
        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let content = doc
                .get_page_content(page_id)
                .and_then(|raw| Content::decode(&raw));
            let content = match content {
                Ok(c) => c,
                Err(e) => {
                    debug!(page = page_number, error = %e, "Content stream decode failed");
                    continue;
                }
            };

            let mut text = String::new();
            for operation in &content.operations {
                match operation.operator.as_str() {
                    "Tj" | "'" | "\"" => {
                        for operand in &operation.operands {
                            if let Object::String(bytes, _) = operand {
                                text.push_str(&decode_bytes(bytes));
                            }
                        }
                        text.push('\n');
                    }
                    "TJ" => {
                        for operand in &operation.operands {
                            if let Object::Array(items) = operand {
                                push_tj_array(&mut text, items);
                            }
                        }
                        text.push('\n');
                    }
                    "T*" | "Td" | "TD" => {
                        if !text.ends_with('\n') && !text.is_empty() {
                            text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            pages.push(page_chunk(text, page_number, self.name()));
        }
        Ok(pages)
    }
}

/// Append a `TJ` array: strings are shown, large negative kerning becomes a space.
fn push_tj_array(out: &mut String, items: &[Object]) {
    for item in items {
        match item {
            Object::String(bytes, _) => out.push_str(&decode_bytes(bytes)),
            Object::Integer(n) if *n < -200 => out.push(' '),
            Object::Real(n) if *n < -200.0 => out.push(' '),
            _ => {}
        }
    }
}

/// UTF-8 when valid, otherwise Latin-1.
fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ---------------------------------------------------------------------------
// RawStreamExtractor
// ---------------------------------------------------------------------------

static TJ_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(((?:[^()\\]|\\.)*)\)\s*(?:Tj|')").expect("Invalid Tj regex")
});

static TJ_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[((?:[^\[\]()]|\((?:[^()\\]|\\.)*\))*)\]\s*TJ").expect("Invalid TJ regex")
});

static LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(((?:[^()\\]|\\.)*)\)").expect("Invalid literal regex")
});

/// Last-resort scan of the raw file for text-showing operators.
///
/// Works without parsing the PDF object graph, so it can recover text from
/// files with a damaged cross-reference table, as long as the content
/// streams are not compressed.
#[derive(Debug, Clone, Default)]
pub struct RawStreamExtractor;

impl TextExtractor for RawStreamExtractor {
    fn name(&self) -> &'static str {
        "raw_stream"
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentChunk>, DocentError> {
        if data.is_empty() {
            return Err(DocentError::Extraction("Empty document data".to_string()));
        }
        if !data.starts_with(b"%PDF") {
            return Err(DocentError::Extraction("Missing %PDF header".to_string()));
        }

        let raw = String::from_utf8_lossy(data);
        let mut hits: Vec<(usize, String)> = Vec::new();
        for caps in TJ_STRING.captures_iter(&raw) {
            if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
                hits.push((whole.start(), unescape_literal(inner.as_str())));
            }
        }
        for caps in TJ_ARRAY.captures_iter(&raw) {
            if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
                let joined: String = LITERAL
                    .captures_iter(inner.as_str())
                    .filter_map(|c| c.get(1))
                    .map(|m| unescape_literal(m.as_str()))
                    .collect();
                hits.push((whole.start(), joined));
            }
        }
        hits.sort_by_key(|(pos, _)| *pos);

        let text = hits
            .into_iter()
            .map(|(_, s)| s)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(vec![page_chunk(text, 1, self.name())])
    }
}

/// Resolve the escape sequences allowed in a PDF literal string.
fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') | Some('f') => {}
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

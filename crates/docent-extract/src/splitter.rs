//! Recursive character splitter.
//!
//! Splits page text into chunks of at most `chunk_size` characters, trying
//! paragraph breaks first, then line breaks, then spaces, and finally single
//! characters. Consecutive chunks share up to `chunk_overlap` characters.

use std::collections::VecDeque;

use docent_core::types::DocumentChunk;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text into overlapping, size-bounded chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. `chunk_size` is clamped to at least 1 and the
    /// overlap to less than the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a text into trimmed, non-blank chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Split every page, carrying the page metadata onto each chunk and
    /// numbering chunks across the whole document.
    pub fn split_pages(&self, pages: &[DocumentChunk]) -> Vec<DocumentChunk> {
        let mut out = Vec::new();
        for page in pages {
            for text in self.split_text(&page.text) {
                let mut metadata = match &page.metadata {
                    serde_json::Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                metadata.insert("chunk_index".to_string(), serde_json::json!(out.len()));
                out.push(DocumentChunk::new(text, serde_json::Value::Object(metadata)));
            }
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (sep, rest) = pick_separator(text, separators);

        let pieces: Vec<&str> = if sep.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(sep).filter(|p| !p.is_empty()).collect()
        };

        let mut out = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                out.extend(self.merge(&fitting, sep));
                fitting.clear();
            }
            out.extend(self.split_recursive(piece, rest));
        }
        if !fitting.is_empty() {
            out.extend(self.merge(&fitting, sep));
        }
        out
    }

    /// Greedily join pieces up to `chunk_size`, keeping a tail of at most
    /// `chunk_overlap` characters as the start of the next chunk.
    fn merge(&self, pieces: &[&str], sep: &str) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined = total + len + if current.is_empty() { 0 } else { sep_len };
            if joined > self.chunk_size && !current.is_empty() {
                chunks.push(join(&current, sep));
                while let Some(front) = current.front() {
                    let needs_room = total + len + sep_len > self.chunk_size;
                    if total <= self.chunk_overlap && !needs_room {
                        break;
                    }
                    let removed = char_len(front);
                    current.pop_front();
                    total -= removed;
                    if !current.is_empty() {
                        total -= sep_len;
                    }
                }
            }
            if !current.is_empty() {
                total += sep_len;
            }
            total += len;
            current.push_back(piece);
        }

        if !current.is_empty() {
            chunks.push(join(&current, sep));
        }
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(4000, 200)
    }
}

fn pick_separator<'a, 'b>(text: &str, separators: &'b [&'a str]) -> (&'a str, &'b [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn join(pieces: &VecDeque<&str>, sep: &str) -> String {
    pieces.iter().copied().collect::<Vec<_>>().join(sep)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = TextSplitter::new(100, 10);
        let chunks = splitter.split_text("A short paragraph.");
        assert_eq!(chunks, vec!["A short paragraph.".to_string()]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let splitter = TextSplitter::new(100, 10);
        assert!(splitter.split_text("   \n\n \t ").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(20, 0);
        let chunks = splitter.split_text("first paragraph\n\nsecond paragraph");
        assert_eq!(chunks, vec!["first paragraph", "second paragraph"]);
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let splitter = TextSplitter::new(30, 5);
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = TextSplitter::new(20, 10);
        let chunks = splitter.split_text("aa bb cc dd ee ff gg hh ii jj kk");
        assert_eq!(
            chunks,
            vec!["aa bb cc dd ee ff gg", "ee ff gg hh ii jj kk"]
        );
    }

    #[test]
    fn test_unbroken_text_hard_split() {
        let splitter = TextSplitter::new(10, 0);
        let chunks = splitter.split_text(&"x".repeat(35));
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[3].len(), 5);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let splitter = TextSplitter::new(5, 0);
        let chunks = splitter.split_text("ééééééééé");
        assert_eq!(chunks, vec!["ééééé", "éééé"]);
    }

    #[test]
    fn test_overlap_clamped_below_chunk_size() {
        let splitter = TextSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap(), 9);
    }

    #[test]
    fn test_split_pages_carries_metadata() {
        let splitter = TextSplitter::new(20, 0);
        let pages = vec![
            DocumentChunk::new("page one body", serde_json::json!({"page": 1})),
            DocumentChunk::new("   ", serde_json::json!({"page": 2})),
            DocumentChunk::new("alpha beta\n\ngamma delta", serde_json::json!({"page": 3})),
        ];
        let chunks = splitter.split_pages(&pages);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].metadata["page"], 1);
        assert_eq!(chunks[0].metadata["chunk_index"], 0);
        assert_eq!(chunks[2].metadata["page"], 3);
        assert_eq!(chunks[2].metadata["chunk_index"], 2);
    }
}

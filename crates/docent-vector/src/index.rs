//! In-memory vector index with brute-force cosine similarity search, plus
//! the retrieval seam the conversation layer queries.
//!
//! A document's index is built once by an [`IndexBuilder`] and then only
//! read, so `VectorIndex` is filled through `&mut self` and shared behind an
//! `Arc` afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use docent_core::error::DocentError;
use docent_core::types::DocumentChunk;

use crate::embedding::DynEmbeddingService;

/// A single hit returned from a vector search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Position of the chunk in insertion order.
    pub position: usize,
    /// Cosine similarity score.
    pub score: f64,
    pub chunk: DocumentChunk,
}

#[derive(Debug, Clone)]
struct VectorEntry {
    embedding: Vec<f32>,
    chunk: DocumentChunk,
}

/// Vector index using brute-force cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk with its embedding.
    pub fn insert(&mut self, embedding: Vec<f32>, chunk: DocumentChunk) {
        self.entries.push(VectorEntry { embedding, chunk });
    }

    /// Return the k nearest chunks to the query vector, by descending
    /// similarity. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchHit {
                position,
                score: cosine_similarity(query, &entry.embedding),
                chunk: entry.chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        scored.truncate(k);
        scored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

// =============================================================================
// Retrieval seam
// =============================================================================

/// A searchable index over one document.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Up to `k` chunks relevant to `text`, most relevant first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<DocumentChunk>, DocentError>;

    /// Number of chunks in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a [`RetrievalIndex`] from extracted chunks.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    /// Build an index. An empty chunk list is an `IndexBuild` error.
    async fn build(&self, chunks: Vec<DocumentChunk>)
        -> Result<Arc<dyn RetrievalIndex>, DocentError>;
}

/// A [`VectorIndex`] paired with the embedder that produced it, so queries
/// are embedded the same way as the chunks.
pub struct SemanticIndex {
    index: VectorIndex,
    embedder: Arc<dyn DynEmbeddingService>,
}

impl SemanticIndex {
    pub fn new(index: VectorIndex, embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self { index, embedder }
    }
}

#[async_trait]
impl RetrievalIndex for SemanticIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<DocumentChunk>, DocentError> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed_boxed(text).await?;
        let hits = self.index.search(&query, k);
        debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score).unwrap_or(0.0),
            "Retrieval query served"
        );
        Ok(hits.into_iter().map(|h| h.chunk).collect())
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Embeds every chunk with the configured embedder into a [`SemanticIndex`].
#[derive(Clone)]
pub struct VectorIndexBuilder {
    embedder: Arc<dyn DynEmbeddingService>,
}

impl VectorIndexBuilder {
    pub fn new(embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl IndexBuilder for VectorIndexBuilder {
    async fn build(
        &self,
        chunks: Vec<DocumentChunk>,
    ) -> Result<Arc<dyn RetrievalIndex>, DocentError> {
        if chunks.is_empty() {
            return Err(DocentError::IndexBuild("No chunks to index".to_string()));
        }

        let mut index = VectorIndex::new();
        for chunk in chunks {
            let embedding = self
                .embedder
                .embed_boxed(&chunk.text)
                .await
                .map_err(|e| DocentError::IndexBuild(e.to_string()))?;
            index.insert(embedding, chunk);
        }

        info!(
            chunks = index.len(),
            dims = self.embedder.dimensions(),
            "Vector index built"
        );
        Ok(Arc::new(SemanticIndex::new(index, Arc::clone(&self.embedder))))
    }
}

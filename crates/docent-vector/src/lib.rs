//! Docent vector crate - embedding services, retrieval index, and the
//! background ingestion pipeline.
//!
//! Provides the `EmbeddingService` trait with offline hashing, remote
//! OpenAI-compatible, and mock implementations, a brute-force cosine index
//! behind the `RetrievalIndex` seam, and the pipeline that turns uploaded
//! bytes into a session's document index.

pub mod embedding;
pub mod index;
pub mod pipeline;

pub use embedding::{
    DynEmbeddingService, EmbeddingService, HashEmbedding, MockEmbedding, OpenAiEmbedding,
    OpenAiEmbeddingConfig,
};
pub use index::{IndexBuilder, RetrievalIndex, SearchHit, SemanticIndex, VectorIndex, VectorIndexBuilder};
pub use pipeline::{DocumentSlot, IngestionHandle, IngestionPipeline, CANCELLED_MESSAGE};

//! Embedding service trait and implementations.
//!
//! - `HashEmbedding` hashes word features into a fixed number of buckets. It
//!   needs no network or model files, and texts that share words land close
//!   together, so retrieval stays meaningful offline.
//! - `OpenAiEmbedding` calls an OpenAI-compatible `/embeddings` endpoint.
//! - `MockEmbedding` provides deterministic whole-text vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use docent_core::error::DocentError;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors. Used for both
/// index building (chunks) and retrieval (queries).
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, DocentError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, so it cannot be used as
/// a trait object. This trait boxes the future instead, which lets the
/// provider be chosen from configuration at startup.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, DocentError>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Blanket impl: any `EmbeddingService` automatically implements `DynEmbeddingService`.
impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, DocentError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in values.iter_mut() {
            *val /= norm;
        }
    }
}

fn feature_hash<T: Hash + ?Sized>(feature: &T, salt: u8) -> u64 {
    let mut hasher = DefaultHasher::new();
    salt.hash(&mut hasher);
    feature.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// HashEmbedding - offline feature hashing
// ---------------------------------------------------------------------------

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does",
    "for", "from", "how", "i", "in", "is", "it", "me", "much", "my", "of", "on", "or",
    "say", "says", "that", "the", "this", "to", "was", "were", "what", "when", "where",
    "which", "who", "why", "with", "you", "your",
];

/// Signed feature-hashing embedding over lower-cased words and word bigrams.
///
/// Common function words are dropped first. Every remaining feature adds +1
/// or -1 to one bucket, chosen by two independent hashes. The result is
/// L2-normalized, so cosine similarity grows with the number of shared words.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    /// Create a hashing embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .filter(|t| !STOPWORDS.contains(&t.as_str()))
            .collect()
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str) {
        let bucket = (feature_hash(feature, 0) % self.dimensions as u64) as usize;
        let sign = if feature_hash(feature, 1) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = Self::tokens(text);
        for token in &tokens {
            self.add_feature(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocentError> {
        if text.trim().is_empty() {
            return Err(DocentError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding - remote embeddings endpoint
// ---------------------------------------------------------------------------

/// Connection settings for [`OpenAiEmbedding`].
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    pub embeddings_url: String,
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding service backed by an OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    config: OpenAiEmbeddingConfig,
}

impl std::fmt::Debug for OpenAiEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedding")
            .field("embeddings_url", &self.config.embeddings_url)
            .field("model", &self.config.model)
            .field("dimensions", &self.config.dimensions)
            .finish()
    }
}

impl OpenAiEmbedding {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self, DocentError> {
        if config.api_key.trim().is_empty() {
            return Err(DocentError::Config(
                "An API key is required for the openai embedding provider".to_string(),
            ));
        }
        if !config.embeddings_url.starts_with("http://")
            && !config.embeddings_url.starts_with("https://")
        {
            return Err(DocentError::Config(format!(
                "Embeddings URL must start with http:// or https://: {}",
                config.embeddings_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DocentError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "input": text,
            "dimensions": self.config.dimensions,
        })
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocentError> {
        if text.trim().is_empty() {
            return Err(DocentError::Embedding("Cannot embed empty text".to_string()));
        }

        let response = self
            .client
            .post(&self.config.embeddings_url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| DocentError::Embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocentError::Embedding(format!(
                "Provider returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| DocentError::Embedding(format!("Invalid response payload: {}", e)))?;
        let mut embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DocentError::Embedding("Response contained no embedding".to_string()))?;

        debug!(dims = embedding.len(), "Received remote embedding");
        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic test vectors
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// The output is derived from a hash of the whole input text, so identical
/// inputs produce identical outputs and different inputs are unrelated.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result: Vec<f32> = (0..384u32)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                (((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0) as f32
            })
            .collect();
        l2_normalize(&mut result);
        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DocentError> {
        if text.is_empty() {
            return Err(DocentError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        384
    }
}

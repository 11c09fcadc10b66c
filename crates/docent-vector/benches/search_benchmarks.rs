//! Benchmarks for index building and retrieval over hashed embeddings.
//!
//! Uses 1,000 chunks by default. Set `BENCH_FULL_SCALE=1` to run with
//! 20,000 chunks, roughly a very large PDF at the default chunk size.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use docent_core::types::DocumentChunk;
use docent_vector::embedding::{EmbeddingService, HashEmbedding};
use docent_vector::index::{IndexBuilder, RetrievalIndex, VectorIndex, VectorIndexBuilder};

const CI_CHUNK_COUNT: usize = 1_000;
const FULL_SCALE_CHUNK_COUNT: usize = 20_000;

fn chunk_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_CHUNK_COUNT
    } else {
        CI_CHUNK_COUNT
    }
}

fn generate_chunk_text(index: usize) -> String {
    format!(
        "Section {index}. The agreement between the parties covers delivery \
         schedules, payment terms, and warranty obligations. Invoices are \
         payable within thirty days of receipt. Either party may terminate \
         with ninety days written notice. Clause reference {index}."
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

fn bench_raw_search(c: &mut Criterion) {
    let rt = runtime();
    let embedder = HashEmbedding::default();
    let mut index = VectorIndex::new();
    for i in 0..chunk_count() {
        let text = generate_chunk_text(i);
        let embedding = rt.block_on(embedder.embed(&text)).expect("embed");
        index.insert(embedding, DocumentChunk::new(text, serde_json::json!({})));
    }
    let query = rt
        .block_on(embedder.embed("when are invoices payable"))
        .expect("embed");

    c.bench_function("vector_index_search_top3", |b| {
        b.iter(|| index.search(&query, 3))
    });
}

fn bench_semantic_query(c: &mut Criterion) {
    let rt = runtime();
    let builder = VectorIndexBuilder::new(Arc::new(HashEmbedding::default()));
    let chunks: Vec<DocumentChunk> = (0..chunk_count())
        .map(|i| DocumentChunk::new(generate_chunk_text(i), serde_json::json!({})))
        .collect();
    let index = rt.block_on(builder.build(chunks)).expect("build");

    c.bench_function("semantic_index_query_top3", |b| {
        b.iter(|| rt.block_on(index.query("termination notice period", 3)))
    });
}

criterion_group!(benches, bench_raw_search, bench_semantic_query);
criterion_main!(benches);

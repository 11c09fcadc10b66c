//! Docent application binary - composition root.
//!
//! 1. Resolve CLI args and load configuration from TOML
//! 2. Build the embedder, answer generator and extractor chain
//! 3. Wire the ingestion pipeline and conversation orchestrator
//! 4. Serve the REST API until Ctrl-C, then cancel in-flight ingestion and
//!    give blocking extraction a bounded grace period before exit

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use docent_api::routes;
use docent_api::state::AppState;
use docent_chat::{
    AnswerGenerator, ConversationOrchestrator, OpenAiChatConfig, OpenAiChatGenerator,
};
use docent_core::config::{resolve_data_dir, DocentConfig};
use docent_core::error::DocentError;
use docent_extract::{ExtractorChain, TextSplitter};
use docent_vector::embedding::{
    DynEmbeddingService, HashEmbedding, OpenAiEmbedding, OpenAiEmbeddingConfig,
};
use docent_vector::{IngestionPipeline, VectorIndexBuilder};

use cli::CliArgs;

/// Read the API key named by `[llm].api_key_env`, ignoring blank values.
fn api_key(config: &DocentConfig) -> Option<String> {
    std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
}

fn build_embedder(config: &DocentConfig) -> Result<Arc<dyn DynEmbeddingService>, DocentError> {
    match config.embedding.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedding::new(config.embedding.dimensions))),
        "openai" => {
            let api_key = api_key(config).ok_or_else(|| {
                DocentError::Config(format!(
                    "embedding.provider = \"openai\" requires {} to be set",
                    config.llm.api_key_env
                ))
            })?;
            let embedder = OpenAiEmbedding::new(OpenAiEmbeddingConfig {
                embeddings_url: config.embedding.embeddings_url.clone(),
                api_key,
                model: config.embedding.model.clone(),
                dimensions: config.embedding.dimensions,
                timeout_ms: config.llm.timeout_ms,
            })?;
            Ok(Arc::new(embedder))
        }
        other => Err(DocentError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

/// Chat completions generator. A missing API key is a startup error.
fn build_generator(config: &DocentConfig) -> Result<Arc<dyn AnswerGenerator>, DocentError> {
    let api_key = api_key(config).ok_or_else(|| {
        DocentError::Config(format!(
            "The chat completions endpoint requires {} to be set",
            config.llm.api_key_env
        ))
    })?;
    let generator = OpenAiChatGenerator::new(OpenAiChatConfig {
        chat_completions_url: config.llm.chat_completions_url.clone(),
        api_key,
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        timeout_ms: config.llm.timeout_ms,
    })?;
    tracing::info!(model = %config.llm.model, "Chat completions generator ready");
    Ok(Arc::new(generator))
}

/// How long exit waits for blocking work (PDF extraction) still running
/// after the server has stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Config.
    let config_file = args.resolve_config_path();
    let mut config = DocentConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    // Tracing. RUST_LOG wins over the configured level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Docent v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(config.upload_path()) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    // Retrieval and generation backends.
    let embedder = build_embedder(&config)?;
    tracing::info!(
        provider = %config.embedding.provider,
        dims = embedder.dimensions(),
        "Embedding service ready"
    );
    let generator = match build_generator(&config) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::error!(error = %e, "Answer generator unavailable");
            return Err(e.into());
        }
    };

    let chain = ExtractorChain::pdf_default(TextSplitter::new(
        config.ingest.chunk_size,
        config.ingest.chunk_overlap,
    ));
    tracing::info!(backends = ?chain.backend_names(), "Extractor chain ready");

    let shutdown = CancellationToken::new();
    let pipeline = IngestionPipeline::new(
        chain,
        Arc::new(VectorIndexBuilder::new(embedder)),
        shutdown.clone(),
    );
    let orchestrator = ConversationOrchestrator::new(&config.chat, generator);

    let port = args.resolve_port(config.general.port);
    let addr = format!("127.0.0.1:{}", port);
    let state = AppState::new(config, orchestrator, pipeline);

    // Ctrl-C cancels the root token: the server drains and ingestion stops.
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Shutdown requested");
        signal_token.cancel();
    });

    if let Err(e) = routes::start_server(&addr, state, shutdown).await {
        tracing::error!(addr = %addr, error = %e, "API server failed");
        tracing::error!("Try: DOCENT_PORT={} cargo run -p docent-app", port.wrapping_add(1));
        return Err(e.into());
    }

    Ok(())
}

//! Embedding collaborators (HTTP service, deterministic fake), request
//! batching and token counting for the chunk budget.

pub mod batch;
pub mod fake;
pub mod http;
pub mod tokenize;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use docsearch_core::chunker::WordEstimateCounter;
use docsearch_core::config::{expand_path, ChunkerSettings, EmbeddingSettings};
use docsearch_core::error::Result;
use docsearch_core::traits::{Embedder, TokenCounter};

pub use batch::{embed_in_batches, DEFAULT_BATCH_SIZE};
pub use fake::FakeEmbedder;
pub use http::HttpEmbedder;
pub use tokenize::ModelTokenCounter;

pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = settings.fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    if use_fake {
        info!(dim = settings.dimensions, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimensions)));
    }
    info!(url = %settings.url, dim = settings.dimensions, "using embedding service");
    Ok(Arc::new(HttpEmbedder::new(
        &settings.url,
        settings.dimensions,
        Duration::from_secs(settings.timeout_secs),
    )?))
}

/// Model tokenizer when `tokenizer_path` is set, word estimate otherwise.
pub fn build_token_counter(settings: &ChunkerSettings) -> Result<Arc<dyn TokenCounter>> {
    match &settings.tokenizer_path {
        Some(path) => Ok(Arc::new(ModelTokenCounter::from_file(&expand_path(path))?)),
        None => Ok(Arc::new(WordEstimateCounter)),
    }
}

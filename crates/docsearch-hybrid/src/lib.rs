//! Hybrid lexical + dense retrieval: indexing, fused search, adjacent-chunk
//! expansion, reranking and document ingestion.

pub mod expansion;
pub mod ingest;
pub mod rerank;
pub mod retriever;

use std::sync::Arc;

use docsearch_core::chunker::{Chunker, ChunkingConfig};
use docsearch_core::config::{Bm25Variant, Settings};
use docsearch_core::error::Result;
use docsearch_core::traits::VectorStore;
use docsearch_embed::{build_embedder, build_token_counter};
use docsearch_sections::build_sectioner;
use docsearch_text::build_sparse_encoder;

pub use expansion::{adjacent_filters, expand_adjacent};
pub use ingest::{DocumentIngestor, IngestReport};
pub use rerank::{build_reranker, rerank_candidates, CrossEncoderReranker, LlmReranker};
pub use retriever::{HybridRetriever, RetrievalConfig};

/// Whether the store must apply IDF itself for the configured BM25 variant.
pub fn store_applies_idf(settings: &Settings) -> bool {
    settings.bm25.variant == Bm25Variant::Delegated
}

/// Wire a retriever from settings around an already opened store.
pub fn build_retriever(settings: &Settings, store: Arc<dyn VectorStore>) -> Result<HybridRetriever> {
    let embedder = build_embedder(&settings.embedding)?;
    let encoder = build_sparse_encoder(settings)?;
    let reranker = build_reranker(&settings.reranker)?;
    let config = RetrievalConfig::from_settings(&settings.retrieval, &settings.reranker);
    Ok(HybridRetriever::new(embedder, encoder, store, config).with_reranker(reranker))
}

/// Wire the full ingestion pipeline from settings.
pub fn build_ingestor(settings: &Settings, retriever: Arc<HybridRetriever>) -> Result<DocumentIngestor> {
    let counter = build_token_counter(&settings.chunker)?;
    let chunker = Chunker::new(
        ChunkingConfig {
            max_chunk_tokens: settings.chunker.max_chunk_tokens,
            overlap_tokens: settings.chunker.overlap_tokens,
        },
        counter,
    )?;
    Ok(DocumentIngestor::new(build_sectioner(&settings.sectioner), Arc::new(chunker), retriever))
}

//! Hybrid retrieval orchestrator.
//!
//! Index time: embed chunk texts in batches, score them with the sparse
//! encoder, upsert both vectors. Query time: dense and sparse searches fused
//! by RRF (in the store when it can), adjacent-chunk expansion, then the
//! reranker hand-off.

use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use docsearch_core::config::{RerankerKind, RerankerSettings, RetrievalSettings};
use docsearch_core::error::{Error, Result};
use docsearch_core::fusion::fuse_chunks;
use docsearch_core::traits::{Embedder, Reranker, SparseEncoder, VectorStore};
use docsearch_core::types::{DocumentChunk, RankedResult, ScoredChunk, SparseVector, StoredPoint};
use docsearch_embed::embed_in_batches;

use crate::expansion::expand_adjacent;
use crate::rerank::{fallback_ranking, rerank_candidates};

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub rrf_k: f32,
    pub adjacent_chunk_count: usize,
    pub embedding_batch_size: usize,
    /// Rerank threshold on the 0..=10 scale.
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from_settings(&RetrievalSettings::default(), &RerankerSettings::default())
    }
}

impl RetrievalConfig {
    pub fn from_settings(retrieval: &RetrievalSettings, reranker: &RerankerSettings) -> Self {
        Self {
            top_k: retrieval.top_k,
            dense_weight: retrieval.dense_weight,
            sparse_weight: retrieval.sparse_weight,
            rrf_k: retrieval.rrf_k,
            adjacent_chunk_count: retrieval.adjacent_chunk_count,
            embedding_batch_size: retrieval.embedding_batch_size,
            min_score: if reranker.kind == RerankerKind::None { None } else { reranker.min_score },
        }
    }

    /// Candidates fetched per side: `max(K, K * 4 * weight / (dense + sparse))`.
    pub fn per_side_limits(&self, top_k: usize) -> (usize, usize) {
        let total = self.dense_weight + self.sparse_weight;
        let side = |weight: f32| {
            if total <= 0.0 {
                return top_k;
            }
            top_k.max((top_k as f32 * 4.0 * weight / total).round() as usize)
        };
        (side(self.dense_weight), side(self.sparse_weight))
    }
}

pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    encoder: Arc<dyn SparseEncoder>,
    store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrievalConfig,
}

async fn cancellable<T>(cancel: &CancellationToken, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        encoder: Arc<dyn SparseEncoder>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self { embedder, encoder, store, reranker: None, config }
    }

    pub fn with_reranker(mut self, reranker: Option<Arc<dyn Reranker>>) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the collection sized for the embedder.
    pub async fn prepare(&self) -> Result<()> {
        self.store.ensure_collection(self.embedder.dim()).await
    }

    /// Embed, sparse-encode and upsert `chunks`. Returns the number stored.
    pub async fn index_chunks(&self, chunks: Vec<DocumentChunk>, cancel: &CancellationToken) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let dense = embed_in_batches(self.embedder.as_ref(), &texts, self.config.embedding_batch_size, cancel).await?;
        if dense.len() != chunks.len() {
            return Err(Error::Embedding(format!("expected {} embeddings, got {}", chunks.len(), dense.len())));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let encoder = Arc::clone(&self.encoder);
        let sparse: Vec<SparseVector> = tokio::task::spawn_blocking(move || {
            encoder.observe(&texts);
            texts.par_iter().map(|t| encoder.encode(t)).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Operation(format!("sparse encoding task failed: {e}")))?;

        let points: Vec<StoredPoint> = chunks
            .into_iter()
            .zip(dense)
            .zip(sparse)
            .map(|((chunk, dense), sparse)| StoredPoint { chunk, dense, sparse })
            .collect();
        let count = points.len();
        cancellable(cancel, self.store.upsert(points)).await?;
        info!(collection = self.store.collection(), chunks = count, "indexed chunks");
        Ok(count)
    }

    /// Fused top-K for `query`, without expansion or reranking.
    pub async fn search(&self, query: &str, top_k: usize, cancel: &CancellationToken) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let dense = cancellable(cancel, self.embedder.embed(query)).await?;
        let sparse = self.encoder.encode(query);
        let (dense_limit, sparse_limit) = self.config.per_side_limits(top_k);

        let fused = if self.store.supports_native_fusion() {
            cancellable(cancel, self.store.query_fused(&dense, &sparse, dense_limit, sparse_limit, top_k)).await?
        } else {
            let (dense_hits, sparse_hits) = cancellable(cancel, async {
                futures::try_join!(
                    self.store.query_dense(&dense, dense_limit),
                    self.store.query_sparse(&sparse, sparse_limit)
                )
            })
            .await?;
            debug!(dense = dense_hits.len(), sparse = sparse_hits.len(), "fusing result lists");
            fuse_chunks(&[dense_hits, sparse_hits], self.config.rrf_k, top_k)
        };
        Ok(fused)
    }

    /// Fused top-K followed by adjacent-chunk expansion.
    pub async fn search_with_context(&self, query: &str, top_k: usize, cancel: &CancellationToken) -> Result<Vec<ScoredChunk>> {
        let fused = self.search(query, top_k, cancel).await?;
        expand_adjacent(self.store.as_ref(), fused, self.config.adjacent_chunk_count, cancel).await
    }

    /// Full query path: fusion, expansion and reranking.
    ///
    /// Without a reranker the fused hits are returned as ranked and expansion
    /// is skipped, since neighbours always trail the K hits in retrieval order.
    /// The same holds when a configured reranker fails: the fallback keeps the
    /// first K candidates, which are the fused hits.
    pub async fn retrieve(&self, query: &str, top_k: usize, cancel: &CancellationToken) -> Result<Vec<RankedResult>> {
        let Some(reranker) = self.reranker.as_deref() else {
            let hits = self.search(query, top_k, cancel).await?;
            return Ok(fallback_ranking(hits, top_k));
        };
        let candidates = self.search_with_context(query, top_k, cancel).await?;
        rerank_candidates(Some(reranker), query, candidates, top_k, self.config.min_score, cancel).await
    }

    /// Remove every stored chunk of `source_document`. Corpus statistics keep
    /// counting the removed chunks.
    pub async fn delete_document(&self, source_document: &str) -> Result<()> {
        self.store.delete_by_source(source_document).await?;
        info!(collection = self.store.collection(), source_document, "deleted document");
        Ok(())
    }
}

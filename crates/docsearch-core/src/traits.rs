use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChunkFilter, DocumentChunk, ScoredChunk, SparseVector, StoredPoint};

/// Dense embedding collaborator.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// Embeddings for `texts`, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Relevance scoring collaborator used after retrieval.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per document, in input order, on a 0..=10 scale.
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Where the inverse-document-frequency factor of a sparse vector is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdfMode {
    /// Weights already carry IDF computed from local corpus statistics.
    Local,
    /// The store applies IDF from its own index occupancy.
    Store,
}

/// Text to sparse vector encoder (BM25 variants).
pub trait SparseEncoder: Send + Sync {
    fn encode(&self, text: &str) -> SparseVector;

    /// Record a batch of indexed documents. Stateless encoders ignore this.
    fn observe(&self, _documents: &[String]) {}

    fn idf_mode(&self) -> IdfMode;
}

/// Counts tokens in the unit used for the embedding budget.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Storage and search collaborator holding dense + sparse vectors per chunk.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection name, used for diagnostics.
    fn collection(&self) -> &str;

    /// Create the collection and its payload indexes if missing.
    async fn ensure_collection(&self, dense_dim: usize) -> Result<()>;

    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()>;

    async fn query_dense(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    async fn query_sparse(&self, vector: &SparseVector, limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Whether `query_fused` performs reciprocal rank fusion server-side.
    fn supports_native_fusion(&self) -> bool {
        false
    }

    /// Two prefetches fused by RRF inside the store, top `limit` returned.
    async fn query_fused(
        &self,
        _dense: &[f32],
        _sparse: &SparseVector,
        _dense_limit: usize,
        _sparse_limit: usize,
        _limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Err(crate::error::Error::Operation(format!(
            "collection '{}' does not support native fusion",
            self.collection()
        )))
    }

    /// Remove every chunk whose `source_document` equals `source_document`.
    async fn delete_by_source(&self, source_document: &str) -> Result<()>;

    /// Fetch chunks matching the filter exactly.
    async fn scroll(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<DocumentChunk>>;
}

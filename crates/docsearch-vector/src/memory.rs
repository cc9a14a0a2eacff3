//! In-process store used by tests and small corpora. Optionally fuses the
//! dense and sparse prefetches itself, like a store with server-side RRF.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use docsearch_core::error::{Error, Result};
use docsearch_core::fusion::{fuse_chunks, DEFAULT_RRF_K};
use docsearch_core::traits::VectorStore;
use docsearch_core::types::{ChunkFilter, DocumentChunk, ScoredChunk, SourceKind, SparseVector, StoredPoint};

use crate::sparse::{score_documents, top_positive};

#[derive(Default)]
struct Inner {
    dim: Option<usize>,
    /// Insertion order; upserts replace in place.
    points: Vec<StoredPoint>,
    positions: HashMap<String, usize>,
}

pub struct MemoryVectorStore {
    collection: String,
    native_fusion: bool,
    store_idf: bool,
    rrf_k: f32,
    inner: RwLock<Inner>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl MemoryVectorStore {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            native_fusion: false,
            store_idf: false,
            rrf_k: DEFAULT_RRF_K,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn with_native_fusion(mut self, rrf_k: f32) -> Self {
        self.native_fusion = true;
        self.rrf_k = rrf_k;
        self
    }

    pub fn with_store_idf(mut self, store_idf: bool) -> Self {
        self.store_idf = store_idf;
        self
    }

    pub fn len(&self) -> usize {
        self.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored chunk by id.
    pub fn get(&self, id: &str) -> Option<StoredPoint> {
        let inner = self.read();
        inner.positions.get(id).map(|&i| inner.points[i].clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn dense_hits(&self, vector: &[f32], limit: usize) -> Vec<ScoredChunk> {
        let inner = self.read();
        let mut hits: Vec<ScoredChunk> = inner
            .points
            .iter()
            .map(|p| ScoredChunk { chunk: p.chunk.clone(), score: cosine(vector, &p.dense), source: SourceKind::Dense })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }

    fn sparse_hits(&self, vector: &SparseVector, limit: usize) -> Vec<ScoredChunk> {
        let inner = self.read();
        let docs: Vec<&SparseVector> = inner.points.iter().map(|p| &p.sparse).collect();
        let scores = score_documents(vector, &docs, self.store_idf);
        top_positive(&scores, limit)
            .into_iter()
            .map(|i| ScoredChunk { chunk: inner.points[i].chunk.clone(), score: scores[i], source: SourceKind::Sparse })
            .collect()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, dense_dim: usize) -> Result<()> {
        let mut inner = self.write();
        match inner.dim {
            Some(dim) if dim != dense_dim => Err(Error::store(
                self.collection.as_str(),
                format!("vector dimension {dim} does not match embedder dimension {dense_dim}"),
            )),
            _ => {
                inner.dim = Some(dense_dim);
                Ok(())
            }
        }
    }

    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()> {
        let mut inner = self.write();
        let Some(dim) = inner.dim else {
            return Err(Error::store(self.collection.as_str(), "collection does not exist"));
        };
        if let Some(bad) = points.iter().find(|p| p.dense.len() != dim) {
            return Err(Error::store(
                self.collection.as_str(),
                format!("chunk '{}' has {} dimensions, expected {dim}", bad.chunk.id, bad.dense.len()),
            ));
        }
        for point in points {
            match inner.positions.get(&point.chunk.id).copied() {
                Some(i) => inner.points[i] = point,
                None => {
                    let i = inner.points.len();
                    inner.positions.insert(point.chunk.id.clone(), i);
                    inner.points.push(point);
                }
            }
        }
        Ok(())
    }

    async fn query_dense(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        Ok(self.dense_hits(vector, limit))
    }

    async fn query_sparse(&self, vector: &SparseVector, limit: usize) -> Result<Vec<ScoredChunk>> {
        Ok(self.sparse_hits(vector, limit))
    }

    fn supports_native_fusion(&self) -> bool {
        self.native_fusion
    }

    async fn query_fused(
        &self,
        dense: &[f32],
        sparse: &SparseVector,
        dense_limit: usize,
        sparse_limit: usize,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if !self.native_fusion {
            return Err(Error::Operation(format!("collection '{}' does not support native fusion", self.collection)));
        }
        let lists = [self.dense_hits(dense, dense_limit), self.sparse_hits(sparse, sparse_limit)];
        Ok(fuse_chunks(&lists, self.rrf_k, limit))
    }

    async fn delete_by_source(&self, source_document: &str) -> Result<()> {
        let mut inner = self.write();
        inner.points.retain(|p| p.chunk.source_document != source_document);
        let positions = inner.points.iter().enumerate().map(|(i, p)| (p.chunk.id.clone(), i)).collect();
        inner.positions = positions;
        Ok(())
    }

    async fn scroll(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<DocumentChunk>> {
        let inner = self.read();
        Ok(inner
            .points
            .iter()
            .map(|p| &p.chunk)
            .filter(|c| c.source_document == filter.source_document)
            .filter(|c| filter.section_path.as_ref().map_or(true, |path| &c.section_path == path))
            .filter(|c| filter.chunk_indices.contains(&c.chunk_index))
            .take(limit)
            .cloned()
            .collect())
    }
}

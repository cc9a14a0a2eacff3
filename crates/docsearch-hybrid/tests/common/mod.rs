#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::{Reranker, VectorStore};
use docsearch_core::types::{ChunkFilter, DocumentChunk, ScoredChunk, SourceKind, SparseVector, StoredPoint};
use docsearch_embed::FakeEmbedder;
use docsearch_hybrid::{HybridRetriever, RetrievalConfig};
use docsearch_text::{Bm25Params, DelegatedBm25, Tokenizer};
use docsearch_vector::MemoryVectorStore;

pub fn chunk(source: &str, path: &str, index: usize, total: usize, text: &str) -> DocumentChunk {
    DocumentChunk {
        id: format!("{source}_{path}_{index}"),
        text: text.to_string(),
        embedding: None,
        source_document: source.to_string(),
        start_page: 1,
        end_page: 1,
        chunk_index: index,
        chunk_total: total,
        section: path.to_string(),
        section_path: path.to_string(),
        metadata: Default::default(),
    }
}

pub fn encoder() -> Arc<DelegatedBm25> {
    Arc::new(DelegatedBm25::new(Arc::new(Tokenizer::default()), Bm25Params::default(), 20.0))
}

pub fn memory_retriever(store: Arc<MemoryVectorStore>, config: RetrievalConfig) -> HybridRetriever {
    HybridRetriever::new(Arc::new(FakeEmbedder::new(64)), encoder(), store, config)
}

/// Store returning fixed result lists and answering scrolls from `chunks`.
pub struct FixedStore {
    pub dense: Vec<DocumentChunk>,
    pub sparse: Vec<DocumentChunk>,
    pub chunks: Vec<DocumentChunk>,
    pub scrolls: Mutex<Vec<ChunkFilter>>,
}

impl FixedStore {
    pub fn new(dense: Vec<DocumentChunk>, sparse: Vec<DocumentChunk>, chunks: Vec<DocumentChunk>) -> Self {
        Self { dense, sparse, chunks, scrolls: Mutex::new(Vec::new()) }
    }

    pub fn scrolls(&self) -> Vec<ChunkFilter> {
        self.scrolls.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

fn ranked(list: &[DocumentChunk], limit: usize, source: SourceKind) -> Vec<ScoredChunk> {
    list.iter()
        .take(limit)
        .enumerate()
        .map(|(i, c)| ScoredChunk { chunk: c.clone(), score: 1.0 / (i + 1) as f32, source })
        .collect()
}

#[async_trait]
impl VectorStore for FixedStore {
    fn collection(&self) -> &str {
        "fixed"
    }

    async fn ensure_collection(&self, _dense_dim: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _points: Vec<StoredPoint>) -> Result<()> {
        Ok(())
    }

    async fn query_dense(&self, _vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        Ok(ranked(&self.dense, limit, SourceKind::Dense))
    }

    async fn query_sparse(&self, _vector: &SparseVector, limit: usize) -> Result<Vec<ScoredChunk>> {
        Ok(ranked(&self.sparse, limit, SourceKind::Sparse))
    }

    async fn delete_by_source(&self, _source_document: &str) -> Result<()> {
        Ok(())
    }

    async fn scroll(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<DocumentChunk>> {
        if let Ok(mut scrolls) = self.scrolls.lock() {
            scrolls.push(filter.clone());
        }
        Ok(self
            .chunks
            .iter()
            .filter(|c| c.source_document == filter.source_document)
            .filter(|c| filter.section_path.as_ref().map_or(true, |p| &c.section_path == p))
            .filter(|c| filter.chunk_indices.contains(&c.chunk_index))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Scores documents by how many query words they contain, ×2.5.
pub struct WordOverlapReranker;

#[async_trait]
impl Reranker for WordOverlapReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let words: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
        Ok(documents
            .iter()
            .map(|d| {
                let d = d.to_lowercase();
                words.iter().filter(|w| d.contains(w.as_str())).count() as f32 * 2.5
            })
            .collect())
    }
}

pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        Err(Error::Rerank("service unavailable".into()))
    }
}

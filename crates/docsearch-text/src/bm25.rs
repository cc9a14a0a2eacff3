//! BM25 sparse encoders.
//!
//! tf' = tf·(k1+1) / (tf + k1·(1 − b + b·len/avg_len))
//!
//! The corpus variant multiplies by idf = ln((N − df + 0.5)/(df + 0.5) + 1)
//! from local statistics. The delegated variant leaves idf to the store and
//! uses a fixed average length.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use docsearch_core::config::Bm25Settings;
use docsearch_core::traits::{IdfMode, SparseEncoder};
use docsearch_core::types::{SparseVector, TermId};

use crate::stats::CorpusStatistics;
use crate::tokenizer::{TermFrequencies, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl From<&Bm25Settings> for Bm25Params {
    fn from(s: &Bm25Settings) -> Self {
        Self { k1: s.k1, b: s.b }
    }
}

impl Bm25Params {
    pub fn saturate(&self, tf: f32, len: f32, avg_len: f32) -> f32 {
        let norm = 1.0 - self.b + self.b * (len / avg_len);
        tf * (self.k1 + 1.0) / (tf + self.k1 * norm)
    }
}

pub fn idf(document_count: f32, document_frequency: f32) -> f32 {
    ((document_count - document_frequency + 0.5) / (document_frequency + 0.5) + 1.0).ln()
}

/// BM25 with IDF from locally tracked corpus statistics.
pub struct CorpusBm25 {
    tokenizer: Arc<Tokenizer>,
    stats: Arc<CorpusStatistics>,
    params: Bm25Params,
}

impl CorpusBm25 {
    pub fn new(tokenizer: Arc<Tokenizer>, stats: Arc<CorpusStatistics>, params: Bm25Params) -> Self {
        Self { tokenizer, stats, params }
    }

    pub fn statistics(&self) -> &Arc<CorpusStatistics> {
        &self.stats
    }

    /// Count one document into the corpus statistics.
    pub fn add_document(&self, text: &str) {
        let tf = self.tokenizer.term_frequencies(text);
        self.stats.add_document(tf.token_count, tf.frequencies.into_keys());
    }

    /// Count a batch in parallel, then persist once.
    pub fn add_documents(&self, texts: &[String]) {
        texts.par_iter().for_each(|text| self.add_document(text));
        debug!(batch = texts.len(), total = self.stats.document_count(), "updated corpus statistics");
        self.stats.save_or_warn();
    }

    pub fn compute_sparse_vector(&self, text: &str) -> SparseVector {
        let TermFrequencies { frequencies, token_count } = self.tokenizer.term_frequencies(text);
        if frequencies.is_empty() {
            return SparseVector::default();
        }
        let with_df: Vec<(TermId, u32, f32)> = frequencies
            .into_iter()
            .map(|(term, tf)| (term, tf, self.stats.document_frequency(term) as f32))
            .collect();
        let snapshot = self.stats.snapshot();
        let n = snapshot.effective_count();
        let avg_len = snapshot.average_length();
        let len = token_count as f32;
        SparseVector::from_pairs(
            with_df
                .into_iter()
                .map(|(term, tf, df)| (term, idf(n, df) * self.params.saturate(tf as f32, len, avg_len))),
        )
    }
}

impl SparseEncoder for CorpusBm25 {
    fn encode(&self, text: &str) -> SparseVector {
        self.compute_sparse_vector(text)
    }

    fn observe(&self, documents: &[String]) {
        self.add_documents(documents);
    }

    fn idf_mode(&self) -> IdfMode {
        IdfMode::Local
    }
}

/// BM25 term saturation only; the store applies IDF.
pub struct DelegatedBm25 {
    tokenizer: Arc<Tokenizer>,
    params: Bm25Params,
    average_length: f32,
}

impl DelegatedBm25 {
    pub fn new(tokenizer: Arc<Tokenizer>, params: Bm25Params, average_length: f32) -> Self {
        let average_length = if average_length > 0.0 { average_length } else { 1.0 };
        Self { tokenizer, params, average_length }
    }

    pub fn compute_sparse_vector(&self, text: &str) -> SparseVector {
        let TermFrequencies { frequencies, token_count } = self.tokenizer.term_frequencies(text);
        let len = token_count as f32;
        SparseVector::from_pairs(
            frequencies
                .into_iter()
                .map(|(term, tf)| (term, self.params.saturate(tf as f32, len, self.average_length))),
        )
    }
}

impl SparseEncoder for DelegatedBm25 {
    fn encode(&self, text: &str) -> SparseVector {
        self.compute_sparse_vector(text)
    }

    fn idf_mode(&self) -> IdfMode {
        IdfMode::Store
    }
}

//! Lexical side of retrieval: tokenizer, stable term hashing, corpus
//! statistics and the two BM25 sparse encoders.

pub mod bm25;
pub mod hashing;
pub mod references;
pub mod stats;
pub mod tokenizer;

use std::sync::Arc;

use docsearch_core::config::{expand_path, Bm25Variant, Settings};
use docsearch_core::error::Result;
use docsearch_core::traits::SparseEncoder;

pub use bm25::{Bm25Params, CorpusBm25, DelegatedBm25};
pub use hashing::term_id;
pub use stats::{CorpusStatistics, StatisticsSnapshot};
pub use tokenizer::{StopWords, TermFrequencies, Tokenizer};

/// Sparse encoder selected by `bm25.variant`. The corpus variant loads its
/// statistics from `bm25.statistics_path`.
pub fn build_sparse_encoder(settings: &Settings) -> Result<Arc<dyn SparseEncoder>> {
    let tokenizer = Arc::new(Tokenizer::from_settings(&settings.tokenizer)?);
    let params = Bm25Params::from(&settings.bm25);
    Ok(match settings.bm25.variant {
        Bm25Variant::Corpus => {
            let stats = Arc::new(CorpusStatistics::load(expand_path(&settings.bm25.statistics_path)));
            Arc::new(CorpusBm25::new(tokenizer, stats, params))
        }
        Bm25Variant::Delegated => {
            Arc::new(DelegatedBm25::new(tokenizer, params, settings.bm25.average_document_length))
        }
    })
}

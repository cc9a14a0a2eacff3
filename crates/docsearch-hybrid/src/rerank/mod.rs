//! Reranker collaborators and the post-retrieval hand-off.
//!
//! A failing reranker never fails the query: the pre-rerank order is kept
//! with descending synthetic scores.

pub mod cross_encoder;
pub mod llm;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use docsearch_core::config::{RerankerKind, RerankerSettings};
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Reranker;
use docsearch_core::types::{RankedResult, ScoredChunk};

pub use cross_encoder::CrossEncoderReranker;
pub use llm::LlmReranker;

/// Highest score on the rerank scale.
pub const MAX_SCORE: f32 = 10.0;

pub fn build_reranker(settings: &RerankerSettings) -> Result<Option<Arc<dyn Reranker>>> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    Ok(match settings.kind {
        RerankerKind::None => None,
        RerankerKind::CrossEncoder => Some(Arc::new(CrossEncoderReranker::new(&settings.url, timeout)?)),
        RerankerKind::Llm => Some(Arc::new(LlmReranker::new(
            &settings.url,
            &settings.model,
            settings.api_key.clone(),
            timeout,
        )?)),
    })
}

/// Pre-rerank order with scores falling from `MAX_SCORE` towards zero.
pub fn fallback_ranking(candidates: Vec<ScoredChunk>, top_k: usize) -> Vec<RankedResult> {
    let n = candidates.len().max(1) as f32;
    candidates
        .into_iter()
        .enumerate()
        .take(top_k)
        .map(|(i, hit)| RankedResult {
            chunk: hit.chunk,
            relevance_score: MAX_SCORE * (n - i as f32) / n,
            original_rank: i + 1,
            new_rank: i + 1,
        })
        .collect()
}

/// Order candidates by `scores`, drop those under `min_score`, keep `top_k`
/// and renumber ranks from 1.
pub fn apply_scores(candidates: Vec<ScoredChunk>, scores: &[f32], top_k: usize, min_score: Option<f32>) -> Vec<RankedResult> {
    let mut scored: Vec<(usize, ScoredChunk, f32)> = candidates
        .into_iter()
        .zip(scores.iter().copied())
        .enumerate()
        .map(|(i, (hit, score))| (i, hit, score))
        .collect();
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .filter(|(_, _, score)| min_score.map_or(true, |min| *score >= min))
        .take(top_k)
        .enumerate()
        .map(|(rank, (original, hit, score))| RankedResult {
            chunk: hit.chunk,
            relevance_score: score,
            original_rank: original + 1,
            new_rank: rank + 1,
        })
        .collect()
}

/// Hand `candidates` to the reranker and rank them. Without a reranker, or
/// when it fails, the fallback ranking is returned. Only cancellation errors.
pub async fn rerank_candidates(
    reranker: Option<&dyn Reranker>,
    query: &str,
    candidates: Vec<ScoredChunk>,
    top_k: usize,
    min_score: Option<f32>,
    cancel: &CancellationToken,
) -> Result<Vec<RankedResult>> {
    let Some(reranker) = reranker else {
        return Ok(fallback_ranking(candidates, top_k));
    };
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let documents: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = reranker.rerank(query, &documents) => result,
    };
    match outcome {
        Ok(scores) if scores.len() == candidates.len() => {
            debug!(candidates = candidates.len(), "reranked");
            Ok(apply_scores(candidates, &scores, top_k, min_score))
        }
        Ok(scores) => {
            warn!(expected = candidates.len(), got = scores.len(), "reranker returned wrong score count; keeping retrieval order");
            Ok(fallback_ranking(candidates, top_k))
        }
        Err(e) => {
            warn!(error = %e, "reranking failed; keeping retrieval order");
            Ok(fallback_ranking(candidates, top_k))
        }
    }
}

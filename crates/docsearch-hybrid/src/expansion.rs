//! Adjacent-chunk expansion: pull the index neighbours of each hit from the
//! same section so results carry their surrounding context.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::VectorStore;
use docsearch_core::types::{ChunkFilter, ChunkIdentifier, ScoredChunk, SourceKind};

/// Neighbour lookups for `results`, one filter per (document, section) in
/// first-seen order. Indices stay inside `[0, chunk_total)` and never repeat a
/// chunk already present.
pub fn adjacent_filters(results: &[ScoredChunk], radius: usize) -> Vec<ChunkFilter> {
    let mut present: HashSet<ChunkIdentifier> = results.iter().map(|r| r.chunk.identifier()).collect();
    let mut filters: Vec<ChunkFilter> = Vec::new();
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let radius = radius as i64;

    for hit in results {
        let chunk = &hit.chunk;
        for offset in (-radius..=radius).filter(|&o| o != 0) {
            let target = chunk.chunk_index as i64 + offset;
            if target < 0 || target >= chunk.chunk_total as i64 {
                continue;
            }
            let key = ChunkIdentifier {
                source_document: chunk.source_document.clone(),
                section_path: chunk.section_path.clone(),
                chunk_index: target as usize,
            };
            if !present.insert(key) {
                continue;
            }
            let group = (chunk.source_document.clone(), chunk.section_path.clone());
            let slot = *slots.entry(group).or_insert_with(|| {
                filters.push(ChunkFilter {
                    source_document: chunk.source_document.clone(),
                    section_path: Some(chunk.section_path.clone()),
                    chunk_indices: Vec::new(),
                });
                filters.len() - 1
            });
            filters[slot].chunk_indices.push(target as usize);
        }
    }
    filters
}

/// Append the neighbours of `results` fetched from `store`. The fused order
/// of `results` is left untouched.
pub async fn expand_adjacent(
    store: &dyn VectorStore,
    mut results: Vec<ScoredChunk>,
    radius: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ScoredChunk>> {
    if radius == 0 || results.is_empty() {
        return Ok(results);
    }
    let filters = adjacent_filters(&results, radius);
    let mut seen: HashSet<ChunkIdentifier> = results.iter().map(|r| r.chunk.identifier()).collect();
    let mut added = 0usize;
    for filter in &filters {
        let mut fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = store.scroll(filter, filter.chunk_indices.len()) => fetched?,
        };
        fetched.sort_by_key(|c| c.chunk_index);
        for chunk in fetched {
            if seen.insert(chunk.identifier()) {
                results.push(ScoredChunk { chunk, score: 0.0, source: SourceKind::Adjacent });
                added += 1;
            }
        }
    }
    debug!(lookups = filters.len(), added, "expanded adjacent chunks");
    Ok(results)
}

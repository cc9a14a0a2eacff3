//! Reciprocal Rank Fusion: score = Σ 1/(k + rank), rank starting at 1.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{ScoredChunk, SourceKind};

pub const DEFAULT_RRF_K: f32 = 60.0;

/// Fuse ranked key lists. Output is sorted by fused score descending; ties keep
/// the order in which keys were first seen.
pub fn rrf_scores<K>(lists: &[Vec<K>], k: f32) -> Vec<(K, f32)>
where
    K: Clone + Eq + Hash,
{
    let mut order: Vec<K> = Vec::new();
    let mut scores: HashMap<K, f32> = HashMap::new();
    for list in lists {
        for (pos, key) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (pos + 1) as f32);
            match scores.get_mut(key) {
                Some(s) => *s += contribution,
                None => {
                    scores.insert(key.clone(), contribution);
                    order.push(key.clone());
                }
            }
        }
    }
    let mut fused: Vec<(K, f32)> = order
        .into_iter()
        .map(|key| {
            let s = scores.get(&key).copied().unwrap_or_default();
            (key, s)
        })
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Fuse ranked chunk lists by chunk id and keep the top `limit`.
pub fn fuse_chunks(lists: &[Vec<ScoredChunk>], k: f32, limit: usize) -> Vec<ScoredChunk> {
    let mut by_id: HashMap<&str, &ScoredChunk> = HashMap::new();
    let id_lists: Vec<Vec<String>> = lists
        .iter()
        .map(|list| {
            list.iter()
                .map(|hit| {
                    by_id.entry(hit.chunk.id.as_str()).or_insert(hit);
                    hit.chunk.id.clone()
                })
                .collect()
        })
        .collect();
    rrf_scores(&id_lists, k)
        .into_iter()
        .take(limit)
        .filter_map(|(id, score)| {
            by_id.get(id.as_str()).map(|hit| ScoredChunk {
                chunk: hit.chunk.clone(),
                score,
                source: SourceKind::Fused,
            })
        })
        .collect()
}

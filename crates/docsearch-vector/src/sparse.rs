//! Brute-force sparse scoring shared by the stores.

use std::collections::HashMap;

use docsearch_core::types::{SparseVector, TermId};

/// Okapi IDF from index occupancy: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
fn occupancy_idf(total: usize, df: usize) -> f32 {
    let n = total as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score every document against `query`.
///
/// With `store_idf` the query weights are multiplied by an IDF computed from
/// how many of `documents` contain each query term.
pub fn score_documents(query: &SparseVector, documents: &[&SparseVector], store_idf: bool) -> Vec<f32> {
    let query = if store_idf { weight_by_occupancy(query, documents) } else { query.clone() };
    documents.iter().map(|doc| query.dot(doc)).collect()
}

fn weight_by_occupancy(query: &SparseVector, documents: &[&SparseVector]) -> SparseVector {
    let mut df: HashMap<TermId, usize> = query.indices().iter().map(|&t| (t, 0)).collect();
    for doc in documents {
        for term in doc.indices() {
            if let Some(count) = df.get_mut(term) {
                *count += 1;
            }
        }
    }
    SparseVector::from_pairs(
        query
            .iter()
            .map(|(term, weight)| (term, weight * occupancy_idf(documents.len(), df.get(&term).copied().unwrap_or(0)))),
    )
}

/// Indices of the top `limit` positive scores, best first. Ties keep input order.
pub fn top_positive(scores: &[f32], limit: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > 0.0).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

//! Domain types shared by the sectioner, chunker, scorers and stores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// 32-bit term identifier produced by the tokenizer's stable hash.
pub type TermId = u32;

/// Text of a single page inside a section. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

/// A heading-delimited unit of a document.
///
/// Produced by a sectioner and consumed by the chunker; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSection {
    pub heading: String,
    /// Ancestor headings joined with `" > "`, ending with `heading`.
    pub full_path: String,
    pub level: usize,
    pub start_page: usize,
    pub end_page: usize,
    pub pages: Vec<PageText>,
}

impl DocumentSection {
    /// All page texts joined with blank lines.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// An independently indexed retrieval unit cut from a section.
///
/// - `id`: stable identifier built from source, section path hash and index
/// - `chunk_index`/`chunk_total`: position among siblings of the same section
/// - `start_page`/`end_page`: pages touched by the chunk text
/// - `embedding`: attached by the orchestrator before storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub source_document: String,
    pub start_page: usize,
    pub end_page: usize,
    pub chunk_index: usize,
    pub chunk_total: usize,
    pub section: String,
    pub section_path: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl DocumentChunk {
    pub fn identifier(&self) -> ChunkIdentifier {
        ChunkIdentifier {
            source_document: self.source_document.clone(),
            section_path: self.section_path.clone(),
            chunk_index: self.chunk_index,
        }
    }
}

/// Lookup key used by adjacent-chunk expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkIdentifier {
    pub source_document: String,
    pub section_path: String,
    pub chunk_index: usize,
}

/// Sparse vector of `(term, weight)` pairs, kept sorted by term id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<TermId>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Build from unordered pairs. Duplicate terms are summed.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (TermId, f32)>) -> Self {
        let mut pairs: Vec<(TermId, f32)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(t, _)| *t);
        let mut indices: Vec<TermId> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (term, weight) in pairs {
            match indices.last() {
                Some(last) if *last == term => {
                    if let Some(v) = values.last_mut() {
                        *v += weight;
                    }
                }
                _ => {
                    indices.push(term);
                    values.push(weight);
                }
            }
        }
        Self { indices, values }
    }

    pub fn indices(&self) -> &[TermId] { &self.indices }
    pub fn values(&self) -> &[f32] { &self.values }
    pub fn len(&self) -> usize { self.indices.len() }
    pub fn is_empty(&self) -> bool { self.indices.is_empty() }

    pub fn get(&self, term: TermId) -> Option<f32> {
        self.indices.binary_search(&term).ok().map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product of two sorted sparse vectors (merge join).
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j, mut acc) = (0usize, 0usize, 0f32);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Everything the vector store persists for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub chunk: DocumentChunk,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
}

/// Indicates which retrieval path produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Sparse,
    Fused,
    Adjacent,
}

/// A retrieved chunk with a path-specific score (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
    pub source: SourceKind,
}

/// Final output of the rerank step. Ranks are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub chunk: DocumentChunk,
    pub relevance_score: f32,
    pub original_rank: usize,
    pub new_rank: usize,
}

/// Exact-match filter for fetching chunks of one section by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFilter {
    pub source_document: String,
    pub section_path: Option<String>,
    pub chunk_indices: Vec<usize>,
}

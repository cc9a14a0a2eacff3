//! Section to chunk splitting under a token budget.
//!
//! A section that fits the budget becomes one chunk. Larger sections are cut
//! page by page: the largest fitting word prefix is found by binary search,
//! pulled back to a sentence end when one sits in the chunk's final quarter,
//! and the next chunk starts with an overlap window from the previous tail.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::TokenCounter;
use crate::types::{DocumentChunk, DocumentSection, Meta};

const PAGE_JOINER: &str = "\n\n";
const INLINE_JOINER: &str = " ";

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_chunk_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chunk_tokens: 512, overlap_tokens: 64 }
    }
}

/// Rough estimate of ~0.75 words per model token.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordEstimateCounter;

impl TokenCounter for WordEstimateCounter {
    fn count(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f32 / 0.75) as usize
    }
}

pub struct Chunker {
    config: ChunkingConfig,
    counter: Arc<dyn TokenCounter>,
}

struct Draft {
    text: String,
    start_page: usize,
    end_page: usize,
}

/// Text being accumulated for the next chunk.
struct Pending {
    text: String,
    pages: Option<(usize, usize)>,
    /// Holds text beyond the overlap seed.
    fresh: bool,
    joiner: &'static str,
}

impl Pending {
    fn empty() -> Self {
        Self { text: String::new(), pages: None, fresh: false, joiner: PAGE_JOINER }
    }

    fn joined(&self, next: &str) -> String {
        if self.text.is_empty() {
            next.to_string()
        } else {
            format!("{}{}{}", self.text, self.joiner, next)
        }
    }

    fn prefix_len(&self) -> usize {
        if self.text.is_empty() { 0 } else { self.text.len() + self.joiner.len() }
    }

    fn touch(&mut self, page: usize) {
        self.pages = Some(match self.pages {
            Some((start, end)) => (start.min(page), end.max(page)),
            None => (page, page),
        });
    }
}

impl Chunker {
    /// Fails when `max_chunk_tokens` is zero or `overlap_tokens >= max_chunk_tokens`.
    pub fn new(config: ChunkingConfig, counter: Arc<dyn TokenCounter>) -> Result<Self> {
        if config.max_chunk_tokens == 0 {
            return Err(Error::InvalidConfig("max_chunk_tokens must be greater than zero".into()));
        }
        if config.overlap_tokens >= config.max_chunk_tokens {
            return Err(Error::InvalidConfig(format!(
                "overlap_tokens ({}) must be smaller than max_chunk_tokens ({})",
                config.overlap_tokens, config.max_chunk_tokens
            )));
        }
        Ok(Self { config, counter })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunks for every section in order. A path seen before in the same
    /// document gets an occurrence suffix (`"Pumps > Notes (2)"`) so each
    /// path keeps its own id and index range.
    pub fn chunks_for_sections(&self, sections: &[DocumentSection], source_document: &str) -> Vec<DocumentChunk> {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut chunks = Vec::new();
        for section in sections {
            let seen = occurrences.entry(section.full_path.as_str()).or_insert(0);
            *seen += 1;
            if *seen == 1 {
                chunks.extend(self.chunks_for_section(section, source_document));
            } else {
                let repeated = DocumentSection {
                    full_path: format!("{} ({})", section.full_path, seen),
                    ..section.clone()
                };
                chunks.extend(self.chunks_for_section(&repeated, source_document));
            }
        }
        chunks
    }

    pub fn chunks_for_section(&self, section: &DocumentSection, source_document: &str) -> Vec<DocumentChunk> {
        let full_text = section.full_text();
        if full_text.is_empty() {
            return Vec::new();
        }
        let drafts = if self.counter.count(&full_text) <= self.config.max_chunk_tokens {
            vec![Draft { text: full_text, start_page: section.start_page, end_page: section.end_page }]
        } else {
            self.split(section)
        };

        let path_hash = blake3::hash(section.full_path.as_bytes()).to_hex();
        let chunk_total = drafts.len();
        tracing::debug!(section = %section.full_path, chunks = chunk_total, "chunked section");
        drafts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, draft)| {
                let mut metadata = Meta::new();
                metadata.insert("level".into(), section.level.to_string());
                DocumentChunk {
                    id: format!("{}_{}_{}", source_document, &path_hash.as_str()[..16], chunk_index),
                    text: draft.text,
                    embedding: None,
                    source_document: source_document.to_string(),
                    start_page: draft.start_page,
                    end_page: draft.end_page,
                    chunk_index,
                    chunk_total,
                    section: section.heading.clone(),
                    section_path: section.full_path.clone(),
                    metadata,
                }
            })
            .collect()
    }

    fn split(&self, section: &DocumentSection) -> Vec<Draft> {
        let max = self.config.max_chunk_tokens;
        let mut drafts = Vec::new();
        let mut pending = Pending::empty();

        for page in &section.pages {
            let mut remaining = page.text.trim();
            pending.joiner = PAGE_JOINER;
            while !remaining.is_empty() {
                let candidate = pending.joined(remaining);
                if self.counter.count(&candidate) <= max {
                    pending.text = candidate;
                    pending.touch(page.page);
                    pending.fresh = true;
                    break;
                }

                let bounds = word_ends(remaining);
                let mut fit = self.largest_fitting_prefix(&pending, remaining, &bounds);
                if fit == 0 {
                    if pending.fresh {
                        pending = self.emit(&mut drafts, pending);
                        continue;
                    }
                    if !pending.text.is_empty() {
                        // the overlap seed leaves no room for the next word
                        pending = Pending::empty();
                        continue;
                    }
                    // a single word larger than the whole budget
                    fit = 1;
                }

                let mut cut = bounds[fit - 1];
                if let Some(sentence_cut) = sentence_cut(&pending, remaining, cut) {
                    cut = sentence_cut;
                }
                pending.text = pending.joined(&remaining[..cut]);
                pending.touch(page.page);
                pending.fresh = true;
                pending = self.emit(&mut drafts, pending);
                remaining = remaining[cut..].trim_start();
            }
        }
        if pending.fresh && !pending.text.trim().is_empty() {
            self.emit(&mut drafts, pending);
        }
        drafts
    }

    /// Push `pending` as a draft and return the overlap-seeded successor.
    fn emit(&self, drafts: &mut Vec<Draft>, pending: Pending) -> Pending {
        let (start_page, end_page) = pending.pages.unwrap_or((0, 0));
        let seed = self.overlap_tail(&pending.text);
        drafts.push(Draft { text: pending.text, start_page, end_page });
        if seed.is_empty() {
            return Pending::empty();
        }
        Pending { text: seed, pages: Some((end_page, end_page)), fresh: false, joiner: INLINE_JOINER }
    }

    /// Number of leading words of `remaining` that still fit after `pending`.
    fn largest_fitting_prefix(&self, pending: &Pending, remaining: &str, bounds: &[usize]) -> usize {
        let max = self.config.max_chunk_tokens;
        let (mut lo, mut hi) = (0usize, bounds.len());
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.counter.count(&pending.joined(&remaining[..bounds[mid - 1]])) <= max {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    }

    /// Longest word-aligned suffix within `overlap_tokens`, starting at a
    /// sentence boundary when the suffix contains one.
    fn overlap_tail(&self, text: &str) -> String {
        if self.config.overlap_tokens == 0 {
            return String::new();
        }
        let starts = word_starts(text);
        let (mut lo, mut hi) = (0usize, starts.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.counter.count(&text[starts[mid]..]) <= self.config.overlap_tokens {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        let Some(&start) = starts.get(lo) else {
            return String::new();
        };
        let tail = &text[start..];
        if let Some(boundary) = first_sentence_end(tail) {
            let trimmed = tail[boundary..].trim_start();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        tail.to_string()
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Byte offsets just past each whitespace-delimited word.
fn word_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                ends.push(i);
            }
            in_word = false;
        } else {
            in_word = true;
        }
    }
    if in_word {
        ends.push(text.len());
    }
    ends
}

/// Byte offsets where each whitespace-delimited word begins.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_ws = true;
    for (i, c) in text.char_indices() {
        if !c.is_whitespace() && prev_ws {
            starts.push(i);
        }
        prev_ws = c.is_whitespace();
    }
    starts
}

/// End of the last sentence inside `remaining[..cut]` that lies in the final
/// quarter of the would-be chunk.
fn sentence_cut(pending: &Pending, remaining: &str, cut: usize) -> Option<usize> {
    let offset = pending.prefix_len();
    let total = offset + cut;
    let threshold = total - total / 4;
    let slice = &remaining[..cut];
    let mut best = None;
    let mut chars = slice.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let end = i + c.len_utf8();
        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if at_boundary && offset + end >= threshold {
            best = Some(end);
        }
    }
    best.filter(|&end| end > 0)
}

/// Byte offset just past the first sentence terminator followed by whitespace.
fn first_sentence_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_terminator(c) && chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            return Some(i + c.len_utf8());
        }
    }
    None
}

//! Sections from the document outline.
//!
//! Each outline entry is located in page text near its target page; its body
//! runs until the next located entry.

use async_trait::async_trait;
use tracing::{debug, warn};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{DocumentSection, PageText};

use crate::document::{OutlineNode, ParsedDocument};
use crate::Sectioner;

const PATH_SEPARATOR: &str = " > ";
/// Words tolerated between two heading words in the fuzzy match.
const MAX_WORD_GAP: usize = 2;

#[derive(Debug, Clone)]
pub struct BookmarkSectioner {
    pub max_depth: usize,
    pub skip_pages: usize,
    pub lookahead_pages: usize,
}

impl Default for BookmarkSectioner {
    fn default() -> Self {
        Self { max_depth: 3, skip_pages: 0, lookahead_pages: 3 }
    }
}

/// Flattened outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub path: String,
    pub level: usize,
    pub page: usize,
}

/// Position in the document: page number plus byte offset into its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cursor {
    page: usize,
    offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct Located {
    start: Cursor,
    end: Cursor,
}

impl BookmarkSectioner {
    /// Depth-first flattening, keeping levels `1..=max_depth` whose page is past
    /// the skipped prefix. Children of dropped entries are still visited.
    pub fn flatten(&self, outline: &[OutlineNode]) -> Vec<Bookmark> {
        let mut out = Vec::new();
        let mut ancestors: Vec<String> = Vec::new();
        self.flatten_into(outline, 1, &mut ancestors, &mut out);
        out
    }

    fn flatten_into(&self, nodes: &[OutlineNode], level: usize, ancestors: &mut Vec<String>, out: &mut Vec<Bookmark>) {
        if level > self.max_depth {
            return;
        }
        for node in nodes {
            let title = node.title.trim().to_string();
            ancestors.push(title.clone());
            if node.page > self.skip_pages && !title.is_empty() {
                out.push(Bookmark { title, path: ancestors.join(PATH_SEPARATOR), level, page: node.page });
            }
            self.flatten_into(&node.children, level + 1, ancestors, out);
            ancestors.pop();
        }
    }

    fn locate(&self, texts: &PageTexts, bookmark: &Bookmark, from: Cursor) -> Option<Located> {
        let last = bookmark.page + self.lookahead_pages;
        let forward = bookmark.page..=last;
        let candidates = forward.chain(bookmark.page.checked_sub(1));
        for page in candidates {
            if page < from.page {
                continue;
            }
            let Some(text) = texts.get(page) else { continue };
            let offset = if page == from.page { from.offset } else { 0 };
            if offset > text.len() {
                continue;
            }
            let found = find_case_insensitive(&text[offset..], &bookmark.title)
                .or_else(|| find_word_sequence(&text[offset..], &bookmark.title));
            if let Some((s, e)) = found {
                return Some(Located {
                    start: Cursor { page, offset: offset + s },
                    end: Cursor { page, offset: offset + e },
                });
            }
        }
        None
    }
}

#[async_trait]
impl Sectioner for BookmarkSectioner {
    fn strategy(&self) -> &'static str {
        "bookmark"
    }

    async fn extract(&self, document: &ParsedDocument) -> Result<Vec<DocumentSection>> {
        if document.outline.is_empty() {
            return Err(Error::ExtractionUnsupported {
                strategy: self.strategy(),
                reason: format!("'{}' has no outline", document.name),
            });
        }
        let bookmarks = self.flatten(&document.outline);
        if bookmarks.is_empty() {
            return Err(Error::ExtractionUnsupported {
                strategy: self.strategy(),
                reason: format!("'{}' has no outline entries within the configured depth and pages", document.name),
            });
        }
        let texts = PageTexts::new(document);

        let mut located = Vec::with_capacity(bookmarks.len());
        let mut cursor = Cursor { page: self.skip_pages + 1, offset: 0 };
        for bookmark in &bookmarks {
            let location = match self.locate(&texts, bookmark, cursor) {
                Some(l) => l,
                None => {
                    warn!(title = %bookmark.title, page = bookmark.page, "bookmark heading not found; using page start");
                    let start = Cursor { page: bookmark.page, offset: 0 }.max(cursor);
                    Located { start, end: start }
                }
            };
            cursor = location.end;
            located.push(location);
        }

        let end_of_document = Cursor { page: texts.last_page(), offset: usize::MAX };
        let mut sections = Vec::new();
        for (i, (bookmark, location)) in bookmarks.iter().zip(&located).enumerate() {
            let until = located.get(i + 1).map(|next| next.start).unwrap_or(end_of_document);
            let pages = texts.slice(location.end, until);
            if pages.is_empty() {
                debug!(title = %bookmark.title, "skipping empty bookmark section");
                continue;
            }
            sections.push(DocumentSection {
                heading: bookmark.title.clone(),
                full_path: bookmark.path.clone(),
                level: bookmark.level,
                start_page: pages.first().map(|p| p.page).unwrap_or(bookmark.page),
                end_page: pages.last().map(|p| p.page).unwrap_or(bookmark.page),
                pages,
            });
        }
        debug!(document = %document.name, bookmarks = bookmarks.len(), sections = sections.len(), "bookmark extraction");
        Ok(sections)
    }
}

/// Assembled page texts indexed by page number.
struct PageTexts {
    pages: Vec<(usize, String)>,
}

impl PageTexts {
    fn new(document: &ParsedDocument) -> Self {
        let mut pages: Vec<(usize, String)> =
            document.pages.iter().map(|p| (p.number, p.assembled_text())).collect();
        pages.sort_by_key(|(n, _)| *n);
        Self { pages }
    }

    fn get(&self, page: usize) -> Option<&str> {
        self.pages
            .binary_search_by_key(&page, |(n, _)| *n)
            .ok()
            .map(|i| self.pages[i].1.as_str())
    }

    fn last_page(&self) -> usize {
        self.pages.last().map(|(n, _)| *n).unwrap_or(0)
    }

    /// Non-blank page fragments in `[from, until)`.
    fn slice(&self, from: Cursor, until: Cursor) -> Vec<PageText> {
        let mut out = Vec::new();
        for (number, text) in &self.pages {
            if *number < from.page || *number > until.page {
                continue;
            }
            let start = if *number == from.page { from.offset.min(text.len()) } else { 0 };
            let end = if *number == until.page { until.offset.min(text.len()) } else { text.len() };
            if start >= end {
                continue;
            }
            let fragment = text[start..end].trim();
            if !fragment.is_empty() {
                out.push(PageText { page: *number, text: fragment.to_string() });
            }
        }
        out
    }
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte range of the first case-insensitive occurrence of `needle`.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    for (start, _) in haystack.char_indices() {
        let mut hay = haystack[start..].char_indices();
        let mut matched_end = None;
        let mut ok = true;
        for n in needle.chars() {
            match hay.next() {
                Some((i, h)) if chars_eq(h, n) => matched_end = Some(start + i + h.len_utf8()),
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            if let Some(end) = matched_end {
                return Some((start, end));
            }
        }
    }
    None
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Words of `text` with their byte spans.
fn word_spans(text: &str) -> Vec<(usize, usize, String)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push((s, i, normalize_word(&text[s..i])));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len(), normalize_word(&text[s..])));
    }
    spans
}

/// Heading words in order, allowing up to two unrelated words between
/// consecutive matches (page numbers, line-wrapped markup and the like).
pub fn find_word_sequence(text: &str, heading: &str) -> Option<(usize, usize)> {
    let wanted: Vec<String> =
        heading.split_whitespace().map(normalize_word).filter(|w| !w.is_empty()).collect();
    if wanted.is_empty() {
        return None;
    }
    let words = word_spans(text);
    'start: for first in 0..words.len() {
        if words[first].2 != wanted[0] {
            continue;
        }
        let mut at = first;
        for target in &wanted[1..] {
            let window_end = (at + 2 + MAX_WORD_GAP).min(words.len());
            match (at + 1..window_end).find(|&j| &words[j].2 == target) {
                Some(j) => at = j,
                None => continue 'start,
            }
        }
        return Some((words[first].0, words[at].1));
    }
    None
}

//! Sections from font styling.
//!
//! The most common font size is body text. Distinctly larger sizes are heading
//! levels, largest first. Bold body-size text on its own line is one level
//! below the smallest sized heading.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tracing::debug;

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{DocumentSection, PageText};

use crate::document::{ParsedDocument, Word};
use crate::layout::{join_words, same_line};
use crate::Sectioner;

const PATH_SEPARATOR: &str = " > ";

#[derive(Debug, Clone)]
pub struct FormatSectioner {
    pub max_heading_depth: usize,
    /// Sizes above this never count as headings (cover titles, banners).
    pub max_heading_size: Option<f32>,
    pub heading_color: Option<String>,
    pub skip_pages: usize,
}

impl Default for FormatSectioner {
    fn default() -> Self {
        Self { max_heading_depth: 3, max_heading_size: None, heading_color: None, skip_pages: 0 }
    }
}

/// Half-point size bucket.
fn size_key(size: f32) -> i32 {
    (size * 2.0).round() as i32
}

fn normalize_color(color: &str) -> String {
    color.trim().trim_start_matches('#').to_lowercase()
}

/// Run of consecutive words on one page sharing a style.
struct Block<'a> {
    page: usize,
    words: Vec<&'a Word>,
    size: i32,
    bold: bool,
    color: Option<String>,
    full_line: bool,
}

fn build_blocks(document: &ParsedDocument, skip_pages: usize) -> Vec<Block<'_>> {
    let mut pages: Vec<_> = document.pages.iter().filter(|p| p.number > skip_pages).collect();
    pages.sort_by_key(|p| p.number);

    let mut blocks = Vec::new();
    for page in pages {
        let words = &page.words;
        let mut i = 0;
        while i < words.len() {
            let first = &words[i];
            let style = (size_key(first.font_size), first.bold, first.color.as_deref().map(normalize_color));
            let mut j = i + 1;
            while j < words.len()
                && (size_key(words[j].font_size), words[j].bold, words[j].color.as_deref().map(normalize_color)) == style
            {
                j += 1;
            }
            let starts_line = i == 0 || !same_line(&words[i - 1], &words[i]);
            let ends_line = j == words.len() || !same_line(&words[j - 1], &words[j]);
            blocks.push(Block {
                page: page.number,
                words: words[i..j].iter().collect(),
                size: style.0,
                bold: style.1,
                color: style.2,
                full_line: starts_line && ends_line,
            });
            i = j;
        }
    }
    blocks
}

/// Character-weighted most common size.
fn body_size(blocks: &[Block<'_>]) -> Option<i32> {
    let mut histogram: HashMap<i32, usize> = HashMap::new();
    for block in blocks {
        let chars: usize = block.words.iter().map(|w| w.text.chars().count()).sum();
        *histogram.entry(block.size).or_default() += chars;
    }
    histogram
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(size, _)| size)
}

struct Open<'a> {
    heading: String,
    path: String,
    level: usize,
    start_page: usize,
    body: BTreeMap<usize, Vec<&'a Word>>,
}

impl Open<'_> {
    fn into_section(self) -> Option<DocumentSection> {
        let pages: Vec<PageText> = self
            .body
            .into_iter()
            .map(|(page, words)| PageText { page, text: join_words(words).trim().to_string() })
            .filter(|p| !p.text.is_empty())
            .collect();
        let end_page = pages.last()?.page;
        Some(DocumentSection {
            heading: self.heading,
            full_path: self.path,
            level: self.level,
            start_page: self.start_page.min(pages[0].page),
            end_page,
            pages,
        })
    }
}

impl FormatSectioner {
    fn color_matches(&self, color: Option<&str>) -> bool {
        match &self.heading_color {
            None => true,
            Some(wanted) => color.is_some_and(|c| c == normalize_color(wanted)),
        }
    }

    /// Distinct sizes above body in the heading colour, largest first.
    fn heading_sizes(&self, blocks: &[Block<'_>], body: i32) -> Vec<i32> {
        let ceiling = self.max_heading_size.map(size_key);
        let mut sizes: Vec<i32> = blocks
            .iter()
            .filter(|b| self.color_matches(b.color.as_deref()))
            .map(|b| b.size)
            .filter(|&s| s > body && ceiling.map_or(true, |c| s <= c))
            .collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();
        sizes.truncate(self.max_heading_depth);
        sizes
    }

    fn classify(&self, block: &Block<'_>, body: i32, heading_sizes: &[i32]) -> Option<usize> {
        if !self.color_matches(block.color.as_deref()) {
            return None;
        }
        if let Some(idx) = heading_sizes.iter().position(|&s| s == block.size) {
            return Some(idx + 1);
        }
        (block.bold && block.size == body && block.full_line).then_some(heading_sizes.len() + 1)
    }
}

#[async_trait]
impl Sectioner for FormatSectioner {
    fn strategy(&self) -> &'static str {
        "format"
    }

    async fn extract(&self, document: &ParsedDocument) -> Result<Vec<DocumentSection>> {
        if !document.has_words() {
            return Err(Error::ExtractionUnsupported {
                strategy: self.strategy(),
                reason: format!("'{}' carries no word font information", document.name),
            });
        }
        let blocks = build_blocks(document, self.skip_pages);
        let Some(body) = body_size(&blocks) else {
            return Ok(Vec::new());
        };
        let heading_sizes = self.heading_sizes(&blocks, body);
        debug!(document = %document.name, body_size = body as f32 / 2.0, heading_levels = heading_sizes.len(), "font profile");

        let mut sections = Vec::new();
        let mut hierarchy: BTreeMap<usize, String> = BTreeMap::new();
        let mut current: Option<Open<'_>> = None;
        let mut previous_heading: Option<usize> = None;

        for block in &blocks {
            match self.classify(block, body, &heading_sizes) {
                Some(level) => {
                    let text = join_words(block.words.iter().copied()).trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    if previous_heading == Some(level) {
                        if let Some(open) = current.as_mut().filter(|o| o.level == level && o.body.is_empty()) {
                            open.heading = format!("{} {}", open.heading, text);
                            hierarchy.insert(level, open.heading.clone());
                            open.path = hierarchy.values().cloned().collect::<Vec<_>>().join(PATH_SEPARATOR);
                            continue;
                        }
                    }
                    if let Some(section) = current.take().and_then(Open::into_section) {
                        sections.push(section);
                    }
                    hierarchy.retain(|&l, _| l < level);
                    hierarchy.insert(level, text.clone());
                    current = Some(Open {
                        heading: text,
                        path: hierarchy.values().cloned().collect::<Vec<_>>().join(PATH_SEPARATOR),
                        level,
                        start_page: block.page,
                        body: BTreeMap::new(),
                    });
                    previous_heading = Some(level);
                }
                None => {
                    let open = current.get_or_insert_with(|| Open {
                        heading: document.name.clone(),
                        path: document.name.clone(),
                        level: 0,
                        start_page: block.page,
                        body: BTreeMap::new(),
                    });
                    open.body.entry(block.page).or_default().extend(block.words.iter().copied());
                    previous_heading = None;
                }
            }
        }
        if let Some(section) = current.and_then(Open::into_section) {
            sections.push(section);
        }
        debug!(document = %document.name, sections = sections.len(), "format extraction");
        Ok(sections)
    }
}

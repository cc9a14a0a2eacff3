//! Parsed-document model consumed by every sectioning strategy.
//!
//! Parsers fill in as much as they can: plain page text always, word geometry
//! and fonts when available, and the outline tree when the file has one.

use serde::{Deserialize, Serialize};

use crate::layout;

/// A positioned word. `y` grows downward; sizes are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    /// Hex RGB, e.g. `"1f3864"`.
    #[serde(default)]
    pub color: Option<String>,
}

impl Word {
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = font_size * 0.5 * text.chars().count() as f32;
        Self { text, x, y, width, height: font_size, font_size, bold: false, color: None }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    #[serde(default)]
    pub words: Vec<Word>,
    /// Parser-provided text, used when `words` is empty.
    #[serde(default)]
    pub text: String,
}

impl Page {
    pub fn from_text(number: usize, text: impl Into<String>) -> Self {
        Self { number, words: Vec::new(), text: text.into() }
    }

    pub fn from_words(number: usize, words: Vec<Word>) -> Self {
        Self { number, words, text: String::new() }
    }

    /// Page text rebuilt from word geometry, or the raw text.
    pub fn assembled_text(&self) -> String {
        if self.words.is_empty() {
            self.text.clone()
        } else {
            layout::join_words(&self.words)
        }
    }
}

/// Outline (bookmark) entry. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    pub page: usize,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(title: impl Into<String>, page: usize) -> Self {
        Self { title: title.into(), page, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<OutlineNode>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Document name used as `source_document` and as a fallback title.
    pub name: String,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub outline: Vec<OutlineNode>,
}

impl ParsedDocument {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self { name: name.into(), pages, outline: Vec::new() }
    }

    pub fn with_outline(mut self, outline: Vec<OutlineNode>) -> Self {
        self.outline = outline;
        self
    }

    pub fn has_words(&self) -> bool {
        self.pages.iter().any(|p| !p.words.is_empty())
    }

    pub fn page_count(&self) -> usize {
        self.pages.iter().map(|p| p.number).max().unwrap_or(0)
    }
}

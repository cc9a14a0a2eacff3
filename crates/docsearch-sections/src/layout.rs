//! Rebuild running text from positioned words.
//!
//! Words on one line join with a space. A baseline step larger than 1.5x the
//! local line height starts a paragraph. A normal line step breaks the line
//! only after sentence punctuation or around a list marker; otherwise the
//! line is treated as a soft wrap.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Word;

const PARAGRAPH_FACTOR: f32 = 1.5;
const SAME_LINE_FACTOR: f32 = 0.5;

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\(?(?:\d{1,3}|[a-zA-Z]|[ivxlcIVXLC]{1,5})[.)]|[•▪◦‣*\-–])$").expect("invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Space,
    LineBreak,
    Paragraph,
}

impl Joint {
    pub fn as_str(self) -> &'static str {
        match self {
            Joint::Space => " ",
            Joint::LineBreak => "\n",
            Joint::Paragraph => "\n\n",
        }
    }
}

pub fn is_list_marker(word: &str) -> bool {
    LIST_MARKER.is_match(word)
}

fn ends_clause(word: &str) -> bool {
    word.ends_with(['.', '?', '!', ':', ';'])
}

pub fn same_line(prev: &Word, next: &Word) -> bool {
    let height = local_height(prev, next);
    (next.y - prev.y).abs() <= SAME_LINE_FACTOR * height
}

fn local_height(prev: &Word, next: &Word) -> f32 {
    let h = (prev.height + next.height) / 2.0;
    if h > 0.0 { h } else { 1.0 }
}

/// Separator placed between two consecutive words.
pub fn joint(prev: &Word, next: &Word) -> Joint {
    if same_line(prev, next) {
        return Joint::Space;
    }
    let dy = next.y - prev.y;
    // upward jumps are column or page-region changes
    if dy < 0.0 || dy > PARAGRAPH_FACTOR * local_height(prev, next) {
        return Joint::Paragraph;
    }
    if ends_clause(&prev.text) || is_list_marker(&prev.text) || is_list_marker(&next.text) {
        Joint::LineBreak
    } else {
        Joint::Space
    }
}

pub fn join_words<'a>(words: impl IntoIterator<Item = &'a Word>) -> String {
    let mut out = String::new();
    let mut prev: Option<&Word> = None;
    for word in words {
        if let Some(p) = prev {
            out.push_str(joint(p, word).as_str());
        }
        out.push_str(&word.text);
        prev = Some(word);
    }
    out
}

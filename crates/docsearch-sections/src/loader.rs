//! File loaders producing a [`ParsedDocument`].
//!
//! - `.pdf`: page text via `pdf-extract`, outline via `lopdf` (no word geometry)
//! - `.txt` / `.md`: pages split on form feeds
//! - `.json`: a serialized `ParsedDocument` from an external layout parser

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use docsearch_core::error::{Error, Result};

use crate::document::{OutlineNode, Page, ParsedDocument};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "json"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn load_document(path: &Path) -> Result<ParsedDocument> {
    let name = document_name(path);
    let extension = path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase());
    let bytes = fs::read(path)?;
    let document = match extension.as_deref() {
        Some("pdf") => pdf_from_bytes(&name, &bytes)?,
        Some("txt") | Some("md") => text_from_str(&name, &String::from_utf8_lossy(&bytes)),
        Some("json") => {
            let mut document: ParsedDocument = serde_json::from_slice(&bytes)?;
            if document.name.is_empty() {
                document.name = name;
            }
            document
        }
        _ => {
            return Err(Error::ExtractionUnsupported {
                strategy: "loader",
                reason: format!("unsupported file type: {}", path.display()),
            })
        }
    };
    debug!(path = %path.display(), pages = document.pages.len(), outline = document.outline.len(), "loaded document");
    Ok(document)
}

pub fn pdf_from_bytes(name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Operation(format!("failed to read pdf '{name}': {e}")))?;
    let document = ParsedDocument::new(
        name,
        pages.into_iter().enumerate().map(|(i, text)| Page::from_text(i + 1, text)).collect(),
    );
    Ok(document.with_outline(pdf_outline(name, bytes)))
}

/// Bookmark tree of a PDF. A missing or unreadable outline yields an empty one.
fn pdf_outline(name: &str, bytes: &[u8]) -> Vec<OutlineNode> {
    let toc = match lopdf::Document::load_mem(bytes).and_then(|doc| doc.get_toc()) {
        Ok(toc) => toc,
        Err(e) => {
            debug!(document = name, error = %e, "no readable pdf outline");
            return Vec::new();
        }
    };
    for error in &toc.errors {
        warn!(document = name, %error, "skipped pdf outline entry");
    }
    outline_from_levels(toc.toc.into_iter().map(|entry| (entry.level, entry.title, entry.page)))
}

/// Rebuilds a tree from depth-first `(level, title, page)` entries, levels
/// starting at 1. An entry deeper than its predecessor's child level still
/// becomes that predecessor's child.
pub fn outline_from_levels(entries: impl IntoIterator<Item = (usize, String, usize)>) -> Vec<OutlineNode> {
    fn close(roots: &mut Vec<OutlineNode>, open: &mut Vec<(usize, OutlineNode)>) {
        if let Some((_, node)) = open.pop() {
            match open.last_mut() {
                Some((_, parent)) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    let mut roots = Vec::new();
    let mut open: Vec<(usize, OutlineNode)> = Vec::new();
    for (level, title, page) in entries {
        while open.last().is_some_and(|(l, _)| *l >= level) {
            close(&mut roots, &mut open);
        }
        open.push((level, OutlineNode::new(title, page)));
    }
    while !open.is_empty() {
        close(&mut roots, &mut open);
    }
    roots
}

/// Plain text, one page per form-feed separated block.
pub fn text_from_str(name: &str, text: &str) -> ParsedDocument {
    ParsedDocument::new(
        name,
        text.split('\u{c}').enumerate().map(|(i, t)| Page::from_text(i + 1, t)).collect(),
    )
}

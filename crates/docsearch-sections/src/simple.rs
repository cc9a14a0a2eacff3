use async_trait::async_trait;

use docsearch_core::error::Result;
use docsearch_core::types::{DocumentSection, PageText};

use crate::document::ParsedDocument;
use crate::Sectioner;

/// The whole document, minus skipped leading pages, as one section.
#[derive(Debug, Clone, Default)]
pub struct SimpleSectioner {
    pub skip_pages: usize,
}

#[async_trait]
impl Sectioner for SimpleSectioner {
    fn strategy(&self) -> &'static str {
        "simple"
    }

    async fn extract(&self, document: &ParsedDocument) -> Result<Vec<DocumentSection>> {
        let mut pages: Vec<PageText> = document
            .pages
            .iter()
            .filter(|p| p.number > self.skip_pages)
            .map(|p| PageText { page: p.number, text: p.assembled_text().trim().to_string() })
            .filter(|p| !p.text.is_empty())
            .collect();
        pages.sort_by_key(|p| p.page);
        let (start_page, end_page) = match (pages.first(), pages.last()) {
            (Some(first), Some(last)) => (first.page, last.page),
            _ => return Ok(Vec::new()),
        };
        Ok(vec![DocumentSection {
            heading: document.name.clone(),
            full_path: document.name.clone(),
            level: 1,
            start_page,
            end_page,
            pages,
        }])
    }
}

//! Document sectioning.
//!
//! A [`Sectioner`] turns a [`ParsedDocument`] into heading-delimited
//! [`DocumentSection`]s. Three strategies exist (outline bookmarks, font
//! formatting, whole document); configuration picks one.

pub mod bookmark;
pub mod document;
pub mod format;
pub mod layout;
pub mod loader;
pub mod simple;

use std::sync::Arc;

use async_trait::async_trait;

use docsearch_core::config::{SectionerSettings, SectionerStrategy};
use docsearch_core::error::Result;
use docsearch_core::types::DocumentSection;

pub use bookmark::BookmarkSectioner;
pub use document::{OutlineNode, Page, ParsedDocument, Word};
pub use format::FormatSectioner;
pub use simple::SimpleSectioner;

#[async_trait]
pub trait Sectioner: Send + Sync {
    /// Strategy name used in diagnostics.
    fn strategy(&self) -> &'static str;

    /// Ordered sections. Fails with `Error::ExtractionUnsupported` when the
    /// document lacks the metadata the strategy needs.
    async fn extract(&self, document: &ParsedDocument) -> Result<Vec<DocumentSection>>;
}

pub fn build_sectioner(settings: &SectionerSettings) -> Arc<dyn Sectioner> {
    match settings.strategy {
        SectionerStrategy::Bookmark => Arc::new(BookmarkSectioner {
            max_depth: settings.max_depth,
            skip_pages: settings.skip_pages,
            lookahead_pages: settings.lookahead_pages,
        }),
        SectionerStrategy::Format => Arc::new(FormatSectioner {
            max_heading_depth: settings.max_heading_depth,
            max_heading_size: settings.max_heading_size,
            heading_color: settings.heading_color.clone(),
            skip_pages: settings.skip_pages,
        }),
        SectionerStrategy::Simple => Arc::new(SimpleSectioner { skip_pages: settings.skip_pages }),
    }
}

//! Document ingestion: load, section, chunk, then replace the document's
//! chunks in the store.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use docsearch_core::chunker::Chunker;
use docsearch_core::error::{Error, Result};
use docsearch_sections::loader::load_document;
use docsearch_sections::{ParsedDocument, Sectioner};

use crate::retriever::HybridRetriever;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source_document: String,
    pub sections: usize,
    pub chunks: usize,
}

pub struct DocumentIngestor {
    sectioner: Arc<dyn Sectioner>,
    chunker: Arc<Chunker>,
    retriever: Arc<HybridRetriever>,
}

impl DocumentIngestor {
    pub fn new(sectioner: Arc<dyn Sectioner>, chunker: Arc<Chunker>, retriever: Arc<HybridRetriever>) -> Self {
        Self { sectioner, chunker, retriever }
    }

    pub fn retriever(&self) -> &Arc<HybridRetriever> {
        &self.retriever
    }

    /// Parse `path` off the async executor and ingest it.
    pub async fn ingest_file(&self, path: &Path, cancel: &CancellationToken) -> Result<IngestReport> {
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || load_document(&owned))
            .await
            .map_err(|e| Error::Operation(format!("document loading task failed: {e}")))??;
        self.ingest_document(&document, cancel).await
    }

    /// Section and chunk `document`, drop previously stored chunks of the same
    /// name and index the new ones.
    pub async fn ingest_document(&self, document: &ParsedDocument, cancel: &CancellationToken) -> Result<IngestReport> {
        let sections = self.sectioner.extract(document).await?;
        let chunks = self.chunker.chunks_for_sections(&sections, &document.name);
        info!(
            document = %document.name,
            strategy = self.sectioner.strategy(),
            sections = sections.len(),
            chunks = chunks.len(),
            "sectioned document"
        );
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.retriever.prepare().await?;
        self.retriever.delete_document(&document.name).await?;
        let stored = self.retriever.index_chunks(chunks, cancel).await?;
        Ok(IngestReport { source_document: document.name.clone(), sections: sections.len(), chunks: stored })
    }
}

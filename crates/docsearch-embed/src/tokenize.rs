use std::path::Path;

use tokenizers::Tokenizer;
use tracing::warn;

use docsearch_core::chunker::WordEstimateCounter;
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::TokenCounter;

/// Counts tokens with the embedding model's own `tokenizer.json`.
pub struct ModelTokenCounter {
    tokenizer: Tokenizer,
}

impl ModelTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::InvalidConfig(format!("failed to load tokenizer from {}: {}", path.display(), e)))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for ModelTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.get_ids().len(),
            Err(e) => {
                warn!(error = %e, "tokenization failed; using word estimate");
                WordEstimateCounter.count(text)
            }
        }
    }
}

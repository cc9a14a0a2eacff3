use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// The chosen sectioning strategy needs document metadata that is absent.
    #[error("Extraction unsupported by '{strategy}' strategy: {reason}")]
    ExtractionUnsupported { strategy: &'static str, reason: String },

    #[error("Vector store error on collection '{collection}': {message}")]
    Store { collection: String, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn store(collection: impl Into<String>, message: impl ToString) -> Self {
        Self::Store { collection: collection.into(), message: message.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

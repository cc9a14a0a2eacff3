//! Vector stores holding one dense and one sparse vector per chunk.

pub mod lance;
pub mod memory;
pub mod schema;
pub mod sparse;

use std::sync::Arc;

use docsearch_core::config::{expand_path, StoreSettings};
use docsearch_core::error::Result;
use docsearch_core::traits::VectorStore;

pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;

/// Open the configured LanceDB collection, creating the directory if needed.
pub async fn open_store(settings: &StoreSettings, store_idf: bool) -> Result<Arc<dyn VectorStore>> {
    let path = expand_path(&settings.path);
    std::fs::create_dir_all(&path)?;
    let store = LanceVectorStore::open(&path.to_string_lossy(), &settings.collection)
        .await?
        .with_store_idf(store_idf);
    Ok(Arc::new(store))
}

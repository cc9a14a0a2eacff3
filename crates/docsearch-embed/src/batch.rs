use tokio_util::sync::CancellationToken;
use tracing::debug;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Embed `texts` in slices of `batch_size`, preserving input order. Each
/// request races `cancel`; cancellation aborts the in-flight call.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let embedded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = embedder.embed_batch(batch) => result?,
        };
        debug!(batch = i, size = batch.len(), "embedding batch done");
        vectors.extend(embedded);
    }
    Ok(vectors)
}

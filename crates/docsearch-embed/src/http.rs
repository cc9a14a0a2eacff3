//! Client for the embedding service: `POST {url}/embed`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    dimensions: Option<usize>,
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    dim: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, dim: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Embedding(format!("failed to build http client: {e}")))?;
        Ok(Self { client, endpoint: format!("{}/embed", base_url.trim_end_matches('/')), dim })
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Embedding(format!("embedding request timed out: {e}"))
    } else {
        Error::Embedding(format!("embedding request failed: {e}"))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response: EmbedResponse = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { texts })
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?
            .json()
            .await
            .map_err(transport_error)?;

        if response.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        if let Some(bad) = response.embeddings.iter().find(|v| v.len() != self.dim) {
            return Err(Error::Embedding(format!(
                "expected dimension {}, got {} (service reports {:?})",
                self.dim,
                bad.len(),
                response.dimensions
            )));
        }
        debug!(batch = texts.len(), "embedded batch");
        Ok(response.embeddings)
    }
}

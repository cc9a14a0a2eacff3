//! Client for the cross-encoder service: `POST {url}/rerank`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Reranker;

/// The service returns sigmoid probabilities; results use a 0..=10 scale.
const SCORE_SCALE: f32 = 10.0;

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

pub struct CrossEncoderReranker {
    client: reqwest::Client,
    endpoint: String,
}

impl CrossEncoderReranker {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rerank(format!("failed to build http client: {e}")))?;
        Ok(Self { client, endpoint: format!("{}/rerank", base_url.trim_end_matches('/')) })
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let response: RerankResponse = self
            .client
            .post(&self.endpoint)
            .json(&RerankRequest { query, documents })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Rerank(format!("cross-encoder request failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Rerank(format!("invalid cross-encoder response: {e}")))?;
        if response.scores.len() != documents.len() {
            return Err(Error::Rerank(format!(
                "expected {} scores, got {}",
                documents.len(),
                response.scores.len()
            )));
        }
        Ok(response.scores.into_iter().map(|s| s.clamp(0.0, 1.0) * SCORE_SCALE).collect())
    }
}

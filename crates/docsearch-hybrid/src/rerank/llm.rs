//! Reranking through an OpenAI-compatible chat completions endpoint.
//!
//! The model must answer with a bare JSON array `[{"id": 0, "score": 7.5}, ...]`
//! holding one entry per document. Anything else is an error, which the
//! caller turns into the pre-rerank fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Reranker;

const SYSTEM_PROMPT: &str = "You score how relevant each document is to a search query. \
Return ONLY a JSON array with one object per document, in the order given: \
[{\"id\": <document id>, \"score\": <number from 0 to 10>}]. \
No prose, no markdown.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LlmScore {
    pub id: usize,
    pub score: f32,
}

pub struct LlmReranker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl LlmReranker {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rerank(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

fn user_prompt(query: &str, documents: &[String]) -> String {
    let mut prompt = format!("Query: {query}\n\nDocuments:\n");
    for (id, doc) in documents.iter().enumerate() {
        prompt.push_str(&format!("[{id}] {}\n\n", doc.trim()));
    }
    prompt.push_str(&format!("Score all {} documents.", documents.len()));
    prompt
}

/// Parse the model answer into scores ordered like the input documents.
pub fn parse_scores(content: &str, expected: usize) -> Result<Vec<f32>> {
    let body = content.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .map(|b| b.trim_end().trim_end_matches("```").trim())
        .unwrap_or(body);
    let entries: Vec<LlmScore> =
        serde_json::from_str(body).map_err(|e| Error::Rerank(format!("unparseable rerank answer: {e}")))?;
    if entries.len() != expected {
        return Err(Error::Rerank(format!("expected {expected} scores, got {}", entries.len())));
    }
    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for entry in entries {
        match scores.get_mut(entry.id) {
            Some(slot @ None) => *slot = Some(entry.score.clamp(0.0, 10.0)),
            Some(Some(_)) => return Err(Error::Rerank(format!("duplicate document id {}", entry.id))),
            None => return Err(Error::Rerank(format!("unknown document id {}", entry.id))),
        }
    }
    scores
        .into_iter()
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| Error::Rerank("missing document scores".into()))
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(query, documents) },
            ],
        });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response: ChatResponse = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Rerank(format!("llm request failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Rerank(format!("invalid llm response: {e}")))?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Rerank("llm response has no content".into()))?;
        parse_scores(&content, documents.len())
    }
}

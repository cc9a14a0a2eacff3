//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Every settings section has defaults, so a missing file or table is fine.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Build from an explicit figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// All sections, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tokenizer: TokenizerSettings,
    pub bm25: Bm25Settings,
    pub sectioner: SectionerSettings,
    pub chunker: ChunkerSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub store: StoreSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chunker.max_chunk_tokens == 0 {
            return Err(Error::InvalidConfig("chunker.max_chunk_tokens must be > 0".into()));
        }
        if self.chunker.overlap_tokens >= self.chunker.max_chunk_tokens {
            return Err(Error::InvalidConfig(
                "chunker.overlap_tokens must be smaller than chunker.max_chunk_tokens".into(),
            ));
        }
        let weights = self.retrieval.dense_weight + self.retrieval.sparse_weight;
        if self.retrieval.dense_weight < 0.0 || self.retrieval.sparse_weight < 0.0 || weights <= 0.0 {
            return Err(Error::InvalidConfig("retrieval weights must be non-negative with a positive sum".into()));
        }
        if self.retrieval.embedding_batch_size == 0 {
            return Err(Error::InvalidConfig("retrieval.embedding_batch_size must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    /// Stopword list language (`english`, `french`, ...) or `none`.
    pub stopwords: String,
    pub min_token_length: usize,
    pub preserve_references: bool,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self { stopwords: "english".into(), min_token_length: 2, preserve_references: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bm25Variant {
    /// Local corpus statistics supply IDF.
    Corpus,
    /// The vector store applies IDF; only term-frequency saturation is local.
    Delegated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Settings {
    pub variant: Bm25Variant,
    pub k1: f32,
    pub b: f32,
    /// Fixed average length used by the delegated variant.
    pub average_document_length: f32,
    pub statistics_path: String,
}

impl Default for Bm25Settings {
    fn default() -> Self {
        Self {
            variant: Bm25Variant::Corpus,
            k1: 1.2,
            b: 0.75,
            average_document_length: 256.0,
            statistics_path: "~/.docsearch/corpus_stats.json".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionerStrategy {
    Bookmark,
    Format,
    Simple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionerSettings {
    pub strategy: SectionerStrategy,
    /// Leading pages ignored by every strategy (cover, table of contents).
    pub skip_pages: usize,
    /// Deepest outline level kept by the bookmark strategy.
    pub max_depth: usize,
    /// Number of distinct heading sizes recognised by the format strategy.
    pub max_heading_depth: usize,
    pub max_heading_size: Option<f32>,
    /// Hex RGB such as `"1f3864"`; only headings in this color count.
    pub heading_color: Option<String>,
    pub lookahead_pages: usize,
}

impl Default for SectionerSettings {
    fn default() -> Self {
        Self {
            strategy: SectionerStrategy::Bookmark,
            skip_pages: 0,
            max_depth: 3,
            max_heading_depth: 3,
            max_heading_size: None,
            heading_color: None,
            lookahead_pages: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerSettings {
    pub max_chunk_tokens: usize,
    pub overlap_tokens: usize,
    /// `tokenizer.json` of the embedding model; word estimate when absent.
    pub tokenizer_path: Option<String>,
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self { max_chunk_tokens: 512, overlap_tokens: 64, tokenizer_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub rrf_k: f32,
    pub adjacent_chunk_count: usize,
    pub embedding_batch_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            dense_weight: 0.7,
            sparse_weight: 0.3,
            rrf_k: crate::fusion::DEFAULT_RRF_K,
            adjacent_chunk_count: 1,
            embedding_batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub url: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    /// Use the deterministic hash embedder instead of the service.
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { url: "http://localhost:8000".into(), dimensions: 384, timeout_secs: 300, fake: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerKind {
    None,
    CrossEncoder,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub kind: RerankerKind,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Results scoring below this (0..=10 scale) are dropped.
    pub min_score: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            kind: RerankerKind::CrossEncoder,
            url: "http://localhost:8001".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            min_score: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: "~/.docsearch/lancedb".into(), collection: "documents".into() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

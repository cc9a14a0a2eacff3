//! Text normalisation into tokens, term ids and term frequencies.

use std::collections::{HashMap, HashSet};

use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};

use docsearch_core::config::TokenizerSettings;
use docsearch_core::error::{Error, Result};
use docsearch_core::types::TermId;

use crate::hashing::term_id;
use crate::references;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it", "its", "of", "on",
    "that", "the", "to", "was", "will", "with", "or", "but", "not", "this", "these", "they", "them", "their", "there",
    "then", "than", "so", "if", "when", "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could",
    "should", "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
];

/// Stopword configuration for the word analyzer.
#[derive(Debug, Clone)]
pub enum StopWords {
    None,
    English,
    Language(Language),
    Custom(Vec<String>),
}

impl StopWords {
    /// `english`, `none`, or any language tantivy ships a list for.
    pub fn parse(name: &str) -> Result<Self> {
        let language = match name.trim().to_lowercase().as_str() {
            "" | "none" => return Ok(Self::None),
            "english" | "en" => return Ok(Self::English),
            "danish" => Language::Danish,
            "dutch" => Language::Dutch,
            "finnish" => Language::Finnish,
            "french" => Language::French,
            "german" => Language::German,
            "hungarian" => Language::Hungarian,
            "italian" => Language::Italian,
            "norwegian" => Language::Norwegian,
            "portuguese" => Language::Portuguese,
            "russian" => Language::Russian,
            "spanish" => Language::Spanish,
            "swedish" => Language::Swedish,
            other => return Err(Error::InvalidConfig(format!("unknown stopword language '{other}'"))),
        };
        Ok(Self::Language(language))
    }

    fn filter(&self) -> Result<StopWordFilter> {
        Ok(match self {
            Self::None => StopWordFilter::remove(Vec::<String>::new()),
            Self::English => StopWordFilter::remove(ENGLISH_STOP_WORDS.iter().map(|s| s.to_string())),
            Self::Custom(words) => StopWordFilter::remove(words.iter().map(|w| w.to_lowercase())),
            Self::Language(language) => StopWordFilter::new(*language)
                .ok_or_else(|| Error::InvalidConfig(format!("no stopword list for {language:?}")))?,
        })
    }
}

/// Term counts of one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFrequencies {
    pub frequencies: HashMap<TermId, u32>,
    pub token_count: usize,
}

#[derive(Clone)]
pub struct Tokenizer {
    analyzer: TextAnalyzer,
    min_token_length: usize,
    preserve_references: bool,
}

impl Tokenizer {
    pub fn new(stop_words: StopWords, min_token_length: usize, preserve_references: bool) -> Result<Self> {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(stop_words.filter()?)
            .build();
        Ok(Self { analyzer, min_token_length, preserve_references })
    }

    pub fn from_settings(settings: &TokenizerSettings) -> Result<Self> {
        Self::new(StopWords::parse(&settings.stopwords)?, settings.min_token_length, settings.preserve_references)
    }

    /// Ordered tokens: references first, then plain words. Reference tokens
    /// bypass the stopword and minimum-length filters.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let lowered = text.to_lowercase();
        let (mut tokens, words_source) = if self.preserve_references {
            let extracted = references::extract(&lowered);
            (extracted.tokens, extracted.remainder)
        } else {
            (Vec::new(), lowered)
        };

        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(&words_source);
        while stream.advance() {
            let word = &stream.token().text;
            if word.chars().count() >= self.min_token_length {
                tokens.push(word.clone());
            }
        }
        tokens
    }

    pub fn hash_term(&self, token: &str) -> TermId {
        term_id(token)
    }

    pub fn term_frequencies(&self, text: &str) -> TermFrequencies {
        let tokens = self.tokenize(text);
        let mut frequencies: HashMap<TermId, u32> = HashMap::new();
        for token in &tokens {
            *frequencies.entry(term_id(token)).or_default() += 1;
        }
        TermFrequencies { frequencies, token_count: tokens.len() }
    }

    pub fn unique_term_ids(&self, text: &str) -> HashSet<TermId> {
        self.tokenize(text).iter().map(|t| term_id(t)).collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(ENGLISH_STOP_WORDS.iter().map(|s| s.to_string())))
            .build();
        Self { analyzer, min_token_length: 2, preserve_references: true }
    }
}

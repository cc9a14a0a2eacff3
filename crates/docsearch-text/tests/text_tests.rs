use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use docsearch_core::config::{Bm25Variant, Settings, TokenizerSettings};
use docsearch_core::traits::{IdfMode, SparseEncoder};
use docsearch_text::{
    build_sparse_encoder, term_id, Bm25Params, CorpusBm25, CorpusStatistics, DelegatedBm25, StopWords, Tokenizer,
};

fn tokenizer() -> Arc<Tokenizer> {
    Arc::new(Tokenizer::from_settings(&TokenizerSettings::default()).expect("tokenizer"))
}

#[test]
fn english_stopwords_are_dropped() {
    let tokens = tokenizer().tokenize("The quick brown fox");
    assert_eq!(tokens, vec!["quick", "brown", "fox"]);
}

#[test]
fn references_emit_compound_and_bare_tokens() {
    let tokens = tokenizer().tokenize("Article 4.3.2(a) applies");
    assert!(tokens.contains(&"article_4.3.2.a".to_string()));
    assert!(tokens.contains(&"4.3.2.a".to_string()));
    assert!(tokens.contains(&"applies".to_string()));
}

#[test]
fn references_can_be_disabled() {
    let t = Tokenizer::new(StopWords::English, 2, false).expect("tokenizer");
    let tokens = t.tokenize("Article 4.3.2(a) applies");
    assert!(!tokens.iter().any(|t| t.contains('_')));
    assert!(tokens.contains(&"article".to_string()));
}

#[test]
fn blank_input_yields_nothing() {
    let t = tokenizer();
    for text in ["", "   ", "\n\t"] {
        assert!(t.tokenize(text).is_empty());
        assert!(t.unique_term_ids(text).is_empty());
        let tf = t.term_frequencies(text);
        assert_eq!(tf.token_count, 0);
        assert!(tf.frequencies.is_empty());
    }
}

#[test]
fn short_tokens_are_dropped() {
    let t = Tokenizer::new(StopWords::None, 3, true).expect("tokenizer");
    assert_eq!(t.tokenize("go to the big store"), vec!["the", "big", "store"]);
}

#[test]
fn other_languages_and_unknown_names() {
    assert!(Tokenizer::new(StopWords::parse("french").expect("french"), 2, true).is_ok());
    assert!(StopWords::parse("klingon").is_err());
    let none = Tokenizer::new(StopWords::parse("none").expect("none"), 2, true).expect("tokenizer");
    assert!(none.tokenize("the fox").contains(&"the".to_string()));
}

#[test]
fn term_hash_is_pure_and_distinguishes_terms() {
    assert_eq!(term_id("term1"), term_id("term1"));
    assert_ne!(term_id("term1"), term_id("term2"));
    assert_eq!(tokenizer().hash_term("fox"), term_id("fox"));
}

#[test]
fn term_frequencies_count_repeats() {
    let tf = tokenizer().term_frequencies("hello world hello");
    assert_eq!(tf.token_count, 3);
    let expected: HashMap<u32, u32> = [(term_id("hello"), 2), (term_id("world"), 1)].into_iter().collect();
    assert_eq!(tf.frequencies, expected);
}

#[test]
fn document_frequency_tracks_documents() {
    let stats = Arc::new(CorpusStatistics::new());
    let bm25 = CorpusBm25::new(tokenizer(), stats.clone(), Bm25Params::default());
    let docs: Vec<String> = (0..7).map(|i| format!("pump{i} manual maintenance")).collect();
    bm25.add_documents(&docs);

    assert_eq!(stats.document_count(), 7);
    assert_eq!(stats.document_frequency(term_id("maintenance")), 7);
    assert_eq!(stats.document_frequency(term_id("pump3")), 1);
    assert_eq!(stats.total_token_length(), 21);
}

#[test]
fn idf_decreases_as_document_frequency_grows() {
    let stats = Arc::new(CorpusStatistics::new());
    let bm25 = CorpusBm25::new(tokenizer(), stats.clone(), Bm25Params::default());
    for i in 0..10 {
        bm25.add_document(&format!("filler{i} words here"));
    }

    let mut previous = f32::INFINITY;
    for _ in 0..10 {
        bm25.add_document("valve");
        let weight = bm25.compute_sparse_vector("valve").get(term_id("valve")).expect("weight");
        assert!(weight < previous, "{weight} should be below {previous}");
        assert!(weight > 0.0);
        previous = weight;
    }
}

#[test]
fn corpus_weight_matches_formula() {
    let stats = Arc::new(CorpusStatistics::new());
    let bm25 = CorpusBm25::new(tokenizer(), stats, Bm25Params::default());
    bm25.add_documents(&["alpha beta".to_string(), "alpha gamma delta epsilon".to_string()]);

    let v = bm25.compute_sparse_vector("beta");
    // N=2, df=1, avg=3, len=1, tf=1
    let idf = ((2.0f32 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0).ln();
    let tf = 1.0 * 2.2 / (1.0 + 1.2 * (1.0 - 0.75 + 0.75 * (1.0 / 3.0)));
    assert!((v.get(term_id("beta")).expect("beta") - idf * tf).abs() < 1e-5);
}

#[test]
fn empty_corpus_still_scores() {
    let bm25 = CorpusBm25::new(tokenizer(), Arc::new(CorpusStatistics::new()), Bm25Params::default());
    let v = bm25.compute_sparse_vector("valve pressure");
    assert_eq!(v.len(), 2);
    assert!(v.values().iter().all(|w| w.is_finite() && *w > 0.0));
}

#[test]
fn sparse_vectors_are_sorted() {
    let bm25 = DelegatedBm25::new(tokenizer(), Bm25Params::default(), 100.0);
    let v = bm25.compute_sparse_vector("zeta alpha mu omega beta alpha");
    assert!(v.indices().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(bm25.idf_mode(), IdfMode::Store);
}

#[test]
fn delegated_variant_has_no_idf() {
    let bm25 = DelegatedBm25::new(tokenizer(), Bm25Params::default(), 4.0);
    let v = bm25.compute_sparse_vector("valve valve pressure seal");
    // len=4 equals avg, so norm=1
    let one = 2.2 / (1.0 + 1.2);
    let two = 2.0 * 2.2 / (2.0 + 1.2);
    assert!((v.get(term_id("pressure")).expect("pressure") - one).abs() < 1e-6);
    assert!((v.get(term_id("valve")).expect("valve") - two).abs() < 1e-6);
}

#[test]
fn statistics_round_trip_through_disk() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("nested/stats.json");

    let stats = CorpusStatistics::load(&path);
    assert_eq!(stats.document_count(), 0);
    stats.add_document(3, [term_id("alpha"), term_id("beta")]);
    stats.add_document(5, [term_id("alpha")]);
    stats.save().expect("save");

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
    assert_eq!(raw["documentCount"], 2);
    assert_eq!(raw["totalTokenLength"], 8);
    assert!(raw["perTermDocumentFrequency"].is_object());

    let reloaded = CorpusStatistics::load(&path);
    assert_eq!(reloaded.document_count(), 2);
    assert_eq!(reloaded.total_token_length(), 8);
    assert_eq!(reloaded.document_frequency(term_id("alpha")), 2);
    assert_eq!(reloaded.document_frequency(term_id("beta")), 1);
}

#[test]
fn corrupt_statistics_start_empty() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("stats.json");
    std::fs::write(&path, b"{not json").expect("write");
    let stats = CorpusStatistics::load(&path);
    assert_eq!(stats.document_count(), 0);
    assert_eq!(stats.path(), Some(path.as_path()));
}

#[test]
fn concurrent_adds_keep_totals_consistent() {
    let stats = Arc::new(CorpusStatistics::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let stats = stats.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    stats.add_document(4, [term_id("shared")]);
                    let snap = stats.snapshot();
                    assert_eq!(snap.total_token_length, snap.document_count * 4);
                    assert!(stats.document_frequency(term_id("shared")) <= stats.document_count());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }
    assert_eq!(stats.document_count(), 2000);
    assert_eq!(stats.document_frequency(term_id("shared")), 2000);
}

#[test]
fn saves_during_concurrent_adds_never_exceed_document_count() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("stats.json");
    let stats = Arc::new(CorpusStatistics::load(&path));
    let writers: Vec<_> = (0..4)
        .map(|_| {
            let stats = stats.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    stats.add_document(2, [term_id("shared")]);
                }
            })
        })
        .collect();

    for _ in 0..50 {
        stats.save().expect("save");
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        let count = raw["documentCount"].as_u64().expect("count");
        let df = raw["perTermDocumentFrequency"]
            .as_object()
            .expect("df map")
            .values()
            .filter_map(|v| v.as_u64())
            .max()
            .unwrap_or(0);
        assert!(df <= count, "df {df} exceeds document count {count}");
    }
    for w in writers {
        w.join().expect("thread");
    }
}

#[test]
fn encoder_follows_configured_variant() {
    let tmp = TempDir::new().expect("tmp");
    let mut settings = Settings::default();
    settings.bm25.statistics_path = tmp.path().join("stats.json").to_string_lossy().into_owned();

    let corpus = build_sparse_encoder(&settings).expect("corpus");
    assert_eq!(corpus.idf_mode(), IdfMode::Local);
    corpus.observe(&["alpha beta".to_string()]);
    assert!(tmp.path().join("stats.json").exists());

    settings.bm25.variant = Bm25Variant::Delegated;
    let delegated = build_sparse_encoder(&settings).expect("delegated");
    assert_eq!(delegated.idf_mode(), IdfMode::Store);
}

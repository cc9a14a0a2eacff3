use std::collections::HashSet;
use std::sync::Arc;

use docsearch_core::chunker::{Chunker, ChunkingConfig, WordEstimateCounter};
use docsearch_core::error::Error;
use docsearch_core::traits::TokenCounter;
use docsearch_core::types::{DocumentSection, PageText};

fn section(pages: Vec<(usize, String)>) -> DocumentSection {
    let start_page = pages.first().map(|p| p.0).unwrap_or(1);
    let end_page = pages.last().map(|p| p.0).unwrap_or(1);
    DocumentSection {
        heading: "Scope".into(),
        full_path: "Part 1 > Scope".into(),
        level: 2,
        start_page,
        end_page,
        pages: pages.into_iter().map(|(page, text)| PageText { page, text }).collect(),
    }
}

fn numbered_words(from: usize, to: usize) -> String {
    (from..to).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

fn chunker(max: usize, overlap: usize) -> Chunker {
    Chunker::new(
        ChunkingConfig { max_chunk_tokens: max, overlap_tokens: overlap },
        Arc::new(WordEstimateCounter),
    )
    .expect("valid config")
}

#[test]
fn small_section_becomes_one_chunk() {
    let s = section(vec![(3, "Short text.".into()), (4, "More text.".into())]);
    let chunks = chunker(512, 64).chunks_for_section(&s, "manual");

    assert_eq!(chunks.len(), 1);
    let c = &chunks[0];
    assert_eq!(c.text, "Short text.\n\nMore text.");
    assert_eq!((c.start_page, c.end_page), (3, 4));
    assert_eq!((c.chunk_index, c.chunk_total), (0, 1));
    assert_eq!(c.section, "Scope");
    assert_eq!(c.section_path, "Part 1 > Scope");
    assert!(c.id.starts_with("manual_"));
    assert!(c.id.ends_with("_0"));
    assert!(c.embedding.is_none());
}

#[test]
fn blank_section_yields_nothing() {
    let s = section(vec![(1, "   ".into())]);
    assert!(chunker(512, 64).chunks_for_section(&s, "manual").is_empty());
}

#[test]
fn ids_are_stable_and_unique() {
    let s = section(vec![(1, numbered_words(0, 200))]);
    let c = chunker(40, 8);
    let first = c.chunks_for_section(&s, "manual");
    let second = c.chunks_for_section(&s, "manual");

    let ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
    let again: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, again);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
}

#[test]
fn repeated_section_paths_get_distinct_ids() {
    let notes = |text: &str, page: usize| DocumentSection {
        heading: "Notes".into(),
        full_path: "Pumps > Notes".into(),
        level: 2,
        start_page: page,
        end_page: page,
        pages: vec![PageText { page, text: text.into() }],
    };
    let sections = vec![notes("First notes.", 1), section(vec![(2, "Between.".into())]), notes("Second notes.", 3)];
    let chunks = chunker(512, 64).chunks_for_sections(&sections, "m");

    let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    let paths: Vec<&str> = chunks.iter().map(|c| c.section_path.as_str()).collect();
    assert_eq!(paths, vec!["Pumps > Notes", "Part 1 > Scope", "Pumps > Notes (2)"]);
    assert!(chunks.iter().all(|c| c.chunk_index == 0 && c.chunk_total == 1));
    assert_eq!(chunks[2].section, "Notes");
    assert_eq!(chunks[2].text, "Second notes.");
}

#[test]
fn split_chunks_respect_budget_and_indices() {
    let s = section(vec![
        (5, numbered_words(0, 70)),
        (6, numbered_words(70, 140)),
        (7, numbered_words(140, 210)),
    ]);
    let counter = WordEstimateCounter;
    let chunks = chunker(40, 8).chunks_for_section(&s, "manual");

    assert!(chunks.len() > 1);
    let total = chunks.len();
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.chunk_total, total);
        assert!(counter.count(&c.text) <= 40, "chunk {i} over budget");
        assert!(c.start_page >= s.start_page && c.end_page <= s.end_page);
        assert!(c.start_page <= c.end_page);
    }
    assert_eq!(chunks[0].start_page, 5);
    assert_eq!(chunks[total - 1].end_page, 7);
}

#[test]
fn every_word_is_covered() {
    let s = section(vec![(1, numbered_words(0, 150)), (2, numbered_words(150, 300))]);
    let chunks = chunker(40, 8).chunks_for_section(&s, "manual");
    let seen: HashSet<&str> = chunks.iter().flat_map(|c| c.text.split_whitespace()).collect();
    for i in 0..300 {
        assert!(seen.contains(format!("w{i}").as_str()), "w{i} missing");
    }
}

#[test]
fn next_chunk_starts_with_overlap_from_previous_tail() {
    let s = section(vec![(1, numbered_words(0, 100))]);
    let chunks = chunker(40, 8).chunks_for_section(&s, "manual");

    assert!(chunks.len() >= 2);
    let first_words: Vec<&str> = chunks[0].text.split_whitespace().collect();
    let lead = chunks[1].text.split_whitespace().next().unwrap();
    let tail = &first_words[first_words.len() - 6..];
    assert!(tail.contains(&lead), "{lead} should repeat from previous tail");
}

#[test]
fn zero_overlap_does_not_repeat_words() {
    let s = section(vec![(1, numbered_words(0, 100))]);
    let chunks = chunker(40, 0).chunks_for_section(&s, "manual");
    let words: usize = chunks.iter().map(|c| c.text.split_whitespace().count()).sum();
    assert_eq!(words, 100);
}

#[test]
fn chunks_prefer_sentence_ends() {
    let sentence = "Alpha beta gamma delta epsilon.";
    let text = vec![sentence; 40].join(" ");
    let s = section(vec![(1, text)]);
    let chunks = chunker(40, 8).chunks_for_section(&s, "manual");

    assert!(chunks.len() > 1);
    for c in &chunks[..chunks.len() - 1] {
        assert!(c.text.ends_with('.'), "chunk should end at a sentence: {}", c.text);
    }
    // overlap seeds restart at a sentence boundary
    for c in &chunks[1..] {
        assert!(c.text.starts_with("Alpha"), "unexpected start: {}", c.text);
    }
}

#[test]
fn rejects_invalid_budgets() {
    let zero = Chunker::new(
        ChunkingConfig { max_chunk_tokens: 0, overlap_tokens: 0 },
        Arc::new(WordEstimateCounter),
    );
    assert!(matches!(zero, Err(Error::InvalidConfig(_))));

    let overlap = Chunker::new(
        ChunkingConfig { max_chunk_tokens: 64, overlap_tokens: 64 },
        Arc::new(WordEstimateCounter),
    );
    assert!(matches!(overlap, Err(Error::InvalidConfig(_))));
}

struct CharCounter;

impl TokenCounter for CharCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[test]
fn custom_counter_drives_the_budget() {
    let s = section(vec![(1, numbered_words(0, 120))]);
    let c = Chunker::new(ChunkingConfig { max_chunk_tokens: 30, overlap_tokens: 5 }, Arc::new(CharCounter))
        .expect("valid");
    let chunks = c.chunks_for_section(&s, "manual");
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(CharCounter.count(&chunk.text) <= 30);
    }
}

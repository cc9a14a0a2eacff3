//! Corpus statistics for the corpus-tracking BM25 variant.
//!
//! `(document_count, total_token_length)` change together under one lock so a
//! reader never sees a torn pair. Per-term document frequencies are
//! independent atomic counters. The count is bumped before any df, so
//! `df(t) <= document_count` holds for every observer.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::TermId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    document_count: u64,
    total_token_length: u64,
}

/// Consistent view of the counters used at query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSnapshot {
    pub document_count: u64,
    pub total_token_length: u64,
}

impl StatisticsSnapshot {
    /// `max(1, document_count)`
    pub fn effective_count(&self) -> f32 {
        self.document_count.max(1) as f32
    }

    /// Mean token length, or 1.0 before any document was added.
    pub fn average_length(&self) -> f32 {
        if self.document_count == 0 {
            1.0
        } else {
            self.total_token_length as f32 / self.document_count as f32
        }
    }
}

/// On-disk record.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsRecord {
    document_count: u64,
    total_token_length: u64,
    #[serde(default)]
    per_term_document_frequency: HashMap<TermId, u64>,
}

#[derive(Debug, Default)]
pub struct CorpusStatistics {
    totals: RwLock<Totals>,
    document_frequency: DashMap<TermId, AtomicU64>,
    path: Option<PathBuf>,
}

impl CorpusStatistics {
    /// Empty, in-memory statistics; `save` is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields empty statistics; an unreadable
    /// file is logged and also yields empty statistics. Later saves go to `path`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut stats = match read_record(&path) {
            Ok(Some(record)) => {
                debug!(path = %path.display(), documents = record.document_count, "loaded corpus statistics");
                Self::from_record(record)
            }
            Ok(None) => Self::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load corpus statistics; starting empty");
                Self::new()
            }
        };
        stats.path = Some(path);
        stats
    }

    fn from_record(record: StatisticsRecord) -> Self {
        let document_frequency = record
            .per_term_document_frequency
            .into_iter()
            .map(|(term, df)| (term, AtomicU64::new(df)))
            .collect();
        Self {
            totals: RwLock::new(Totals {
                document_count: record.document_count,
                total_token_length: record.total_token_length,
            }),
            document_frequency,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one document of `token_count` tokens containing `unique_terms`.
    ///
    /// Totals are bumped before any df counter, so a reader that loads df
    /// values first and totals afterwards never sees `df > document_count`.
    pub fn add_document(&self, token_count: usize, unique_terms: impl IntoIterator<Item = TermId>) {
        {
            let mut totals = self.totals.write().unwrap_or_else(|e| e.into_inner());
            totals.document_count += 1;
            totals.total_token_length += token_count as u64;
        }
        for term in unique_terms {
            self.document_frequency
                .entry(term)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let totals = *self.totals.read().unwrap_or_else(|e| e.into_inner());
        StatisticsSnapshot {
            document_count: totals.document_count,
            total_token_length: totals.total_token_length,
        }
    }

    pub fn document_count(&self) -> u64 {
        self.snapshot().document_count
    }

    pub fn total_token_length(&self) -> u64 {
        self.snapshot().total_token_length
    }

    pub fn document_frequency(&self, term: TermId) -> u64 {
        self.document_frequency
            .get(&term)
            .map(|df| df.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Atomically replace the record at the configured path.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let per_term_document_frequency = self
            .document_frequency
            .iter()
            .map(|e| (*e.key(), e.value().load(Ordering::Acquire)))
            .collect();
        let snapshot = self.snapshot();
        let record = StatisticsRecord {
            document_count: snapshot.document_count,
            total_token_length: snapshot.total_token_length,
            per_term_document_frequency,
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let tmp = tempfile::NamedTempFile::new_in(&parent)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &record)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %path.display(), documents = record.document_count, terms = record.per_term_document_frequency.len(), "saved corpus statistics");
        Ok(())
    }

    /// `save`, logging instead of failing.
    pub fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to persist corpus statistics");
        }
    }
}

fn read_record(path: &Path) -> Result<Option<StatisticsRecord>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

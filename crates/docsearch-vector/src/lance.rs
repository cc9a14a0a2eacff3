//! LanceDB-backed store: one table per collection holding payload, dense
//! vector and sparse vector columns for every chunk.

use arrow_array::{RecordBatch, RecordBatchIterator};
use arrow_schema::DataType;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::index::scalar::BTreeIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::VectorStore;
use docsearch_core::types::{ChunkFilter, DocumentChunk, ScoredChunk, SourceKind, SparseVector, StoredPoint};

use crate::schema::{batch_to_rows, chunk_schema, points_to_batch, Row, FILTER_COLUMNS, PAYLOAD_COLUMNS, VECTOR_COLUMN};
use crate::sparse::{score_documents, top_positive};

pub struct LanceVectorStore {
    db: Connection,
    collection: String,
    store_idf: bool,
}

/// Quote a string literal for a Lance SQL filter.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn filter_expression(filter: &ChunkFilter) -> String {
    let indices = filter.chunk_indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let mut expr = format!("source_document = {} AND chunk_index IN ({})", quoted(&filter.source_document), indices);
    if let Some(path) = &filter.section_path {
        expr.push_str(&format!(" AND section_path = {}", quoted(path)));
    }
    expr
}

impl LanceVectorStore {
    /// Connect to the database at `uri`. Failures name the collection.
    pub async fn open(uri: &str, collection: &str) -> Result<Self> {
        let db = connect(uri).execute().await.map_err(|e| Error::store(collection, e))?;
        Ok(Self { db, collection: collection.to_string(), store_idf: false })
    }

    /// Weight sparse query terms by IDF derived from stored vectors.
    pub fn with_store_idf(mut self, store_idf: bool) -> Self {
        self.store_idf = store_idf;
        self
    }

    fn err(&self, e: impl ToString) -> Error {
        Error::store(self.collection.as_str(), e)
    }

    async fn table(&self) -> Result<Table> {
        self.db.open_table(&self.collection).execute().await.map_err(|e| self.err(e))
    }

    async fn exists(&self) -> Result<bool> {
        let names = self.db.table_names().execute().await.map_err(|e| self.err(e))?;
        Ok(names.contains(&self.collection))
    }

    async fn table_dim(&self, table: &Table) -> Result<Option<i32>> {
        let schema = table.schema().await.map_err(|e| self.err(e))?;
        Ok(schema.field_with_name(VECTOR_COLUMN).ok().and_then(|f| match f.data_type() {
            DataType::FixedSizeList(_, n) => Some(*n),
            _ => None,
        }))
    }

    /// Scalar indexes for the exact-match filter columns. Lance still scans
    /// unindexed fragments, so a failure here only costs speed.
    async fn ensure_payload_indexes(&self, table: &Table) {
        let existing = match table.list_indices().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(collection = %self.collection, error = %e, "listing indexes failed");
                return;
            }
        };
        for column in FILTER_COLUMNS {
            if existing.iter().any(|ix| ix.columns.iter().any(|c| c == column)) {
                continue;
            }
            let built = table
                .create_index(&[*column], Index::BTree(BTreeIndexBuilder::default()))
                .execute()
                .await;
            match built {
                Ok(()) => tracing::debug!(collection = %self.collection, column, "created payload index"),
                Err(e) => tracing::warn!(collection = %self.collection, column, error = %e, "payload index not created"),
            }
        }
    }

    async fn collect_rows<E>(&self, mut stream: impl futures::Stream<Item = std::result::Result<RecordBatch, E>> + Unpin) -> Result<Vec<Row>>
    where
        E: std::fmt::Display,
    {
        let mut rows = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| self.err(e))? {
            rows.extend(batch_to_rows(&batch).map_err(|e| self.err(e))?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, dense_dim: usize) -> Result<()> {
        if self.exists().await? {
            let table = self.table().await?;
            if let Some(existing) = self.table_dim(&table).await? {
                if existing as usize != dense_dim {
                    return Err(self.err(format!("vector dimension {existing} does not match embedder dimension {dense_dim}")));
                }
            }
            return Ok(());
        }
        let schema = chunk_schema(dense_dim as i32);
        let empty = RecordBatchIterator::new(vec![].into_iter(), schema);
        self.db
            .create_table(&self.collection, Box::new(empty))
            .execute()
            .await
            .map_err(|e| self.err(e))?;
        tracing::info!(collection = %self.collection, dim = dense_dim, "created collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let table = self.table().await?;
        let dim = match self.table_dim(&table).await? {
            Some(dim) => dim,
            None => return Err(self.err("collection has no vector column")),
        };
        if let Some(bad) = points.iter().find(|p| p.dense.len() != dim as usize) {
            return Err(self.err(format!("chunk '{}' has {} dimensions, expected {dim}", bad.chunk.id, bad.dense.len())));
        }
        let count = points.len();
        let batch = points_to_batch(&points, dim).map_err(|e| self.err(e))?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = table.merge_insert(&["chunk_id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(|e| self.err(e))?;
        tracing::debug!(collection = %self.collection, points = count, "upserted");
        self.ensure_payload_indexes(&table).await;
        Ok(())
    }

    async fn query_dense(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        let stream = table
            .vector_search(vector.to_vec())
            .map_err(|e| self.err(e))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Cosine)
            .select(Select::columns(PAYLOAD_COLUMNS))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| self.err(e))?;
        let rows = self.collect_rows(stream).await?;
        Ok(rows
            .into_iter()
            .map(|row| ScoredChunk {
                score: 1.0 - row.distance.unwrap_or(1.0),
                chunk: row.chunk,
                source: SourceKind::Dense,
            })
            .collect())
    }

    async fn query_sparse(&self, vector: &SparseVector, limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        let stream = table
            .query()
            .select(Select::columns(PAYLOAD_COLUMNS))
            .execute()
            .await
            .map_err(|e| self.err(e))?;
        let rows = self.collect_rows(stream).await?;
        let sparse: Vec<&SparseVector> = rows.iter().map(|r| &r.sparse).collect();
        let scores = score_documents(vector, &sparse, self.store_idf);
        let ranked = top_positive(&scores, limit);
        let mut rows: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
        Ok(ranked
            .into_iter()
            .filter_map(|i| {
                rows[i].take().map(|row| ScoredChunk { chunk: row.chunk, score: scores[i], source: SourceKind::Sparse })
            })
            .collect())
    }

    async fn delete_by_source(&self, source_document: &str) -> Result<()> {
        if !self.exists().await? {
            return Ok(());
        }
        let table = self.table().await?;
        table
            .delete(&format!("source_document = {}", quoted(source_document)))
            .await
            .map_err(|e| self.err(e))?;
        tracing::debug!(collection = %self.collection, source_document, "deleted document chunks");
        Ok(())
    }

    async fn scroll(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<DocumentChunk>> {
        if filter.chunk_indices.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        let stream = table
            .query()
            .only_if(filter_expression(filter))
            .select(Select::columns(PAYLOAD_COLUMNS))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| self.err(e))?;
        let rows = self.collect_rows(stream).await?;
        Ok(rows.into_iter().map(|r| r.chunk).collect())
    }
}

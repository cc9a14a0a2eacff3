//! Arrow layout of the chunk table and conversions to and from domain types.

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, UInt32Type};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, ListArray, RecordBatch, StringArray,
};
use arrow_schema::{ArrowError, DataType, Field, Schema};

use docsearch_core::types::{DocumentChunk, Meta, SparseVector, StoredPoint};

pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Columns needed to rebuild a chunk and its sparse vector (no dense vector).
pub const PAYLOAD_COLUMNS: &[&str] = &[
    "chunk_id",
    "text",
    "source_document",
    "chunk_index",
    "chunk_total",
    "start_page",
    "end_page",
    "section",
    "section_path",
    "metadata",
    "sparse_indices",
    "sparse_values",
];

/// Scalar-indexed payload fields used by exact-match filters.
pub const FILTER_COLUMNS: &[&str] = &["source_document", "section_path", "chunk_index"];

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

pub fn chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("source_document", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("chunk_total", DataType::Int32, false),
        Field::new("start_page", DataType::Int32, false),
        Field::new("end_page", DataType::Int32, false),
        Field::new("section", DataType::Utf8, false),
        Field::new("section_path", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
        Field::new("sparse_indices", list_of(DataType::UInt32), true),
        Field::new("sparse_values", list_of(DataType::Float32), true),
    ]))
}

pub fn points_to_batch(points: &[StoredPoint], dim: i32) -> Result<RecordBatch, ArrowError> {
    let mut ids = Vec::with_capacity(points.len());
    let mut texts = Vec::with_capacity(points.len());
    let mut sources = Vec::with_capacity(points.len());
    let mut chunk_indices = Vec::with_capacity(points.len());
    let mut chunk_totals = Vec::with_capacity(points.len());
    let mut start_pages = Vec::with_capacity(points.len());
    let mut end_pages = Vec::with_capacity(points.len());
    let mut sections = Vec::with_capacity(points.len());
    let mut section_paths = Vec::with_capacity(points.len());
    let mut metadata = Vec::with_capacity(points.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());
    let mut sparse_indices: Vec<Option<Vec<Option<u32>>>> = Vec::with_capacity(points.len());
    let mut sparse_values: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());

    for p in points {
        let c = &p.chunk;
        ids.push(c.id.clone());
        texts.push(c.text.clone());
        sources.push(c.source_document.clone());
        chunk_indices.push(c.chunk_index as i32);
        chunk_totals.push(c.chunk_total as i32);
        start_pages.push(c.start_page as i32);
        end_pages.push(c.end_page as i32);
        sections.push(c.section.clone());
        section_paths.push(c.section_path.clone());
        metadata.push(serde_json::to_string(&c.metadata).map_err(|e| ArrowError::ExternalError(Box::new(e)))?);
        vectors.push(Some(p.dense.iter().map(|&x| Some(x)).collect()));
        sparse_indices.push(Some(p.sparse.indices().iter().map(|&t| Some(t)).collect()));
        sparse_values.push(Some(p.sparse.values().iter().map(|&w| Some(w)).collect()));
    }

    RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int32Array::from(chunk_totals)),
            Arc::new(Int32Array::from(start_pages)),
            Arc::new(Int32Array::from(end_pages)),
            Arc::new(StringArray::from(sections)),
            Arc::new(StringArray::from(section_paths)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
            Arc::new(ListArray::from_iter_primitive::<UInt32Type, _, _>(sparse_indices)),
            Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(sparse_values)),
        ],
    )
}

fn missing(name: &str) -> ArrowError {
    ArrowError::SchemaError(format!("column '{name}' missing or of unexpected type"))
}

fn strings<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| missing(name))
}

fn ints<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| missing(name))
}

fn lists<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ListArray, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| missing(name))
}

/// One decoded row: the chunk, its stored sparse vector, and the search
/// distance when the batch came from a vector query.
pub struct Row {
    pub chunk: DocumentChunk,
    pub sparse: SparseVector,
    pub distance: Option<f32>,
}

pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>, ArrowError> {
    let ids = strings(batch, "chunk_id")?;
    let texts = strings(batch, "text")?;
    let sources = strings(batch, "source_document")?;
    let chunk_indices = ints(batch, "chunk_index")?;
    let chunk_totals = ints(batch, "chunk_total")?;
    let start_pages = ints(batch, "start_page")?;
    let end_pages = ints(batch, "end_page")?;
    let sections = strings(batch, "section")?;
    let section_paths = strings(batch, "section_path")?;
    let metadata = strings(batch, "metadata")?;
    let sparse_indices = lists(batch, "sparse_indices").ok();
    let sparse_values = lists(batch, "sparse_values").ok();
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let meta: Meta = serde_json::from_str(metadata.value(i)).unwrap_or_default();
        let sparse = match (sparse_indices, sparse_values) {
            (Some(idx), Some(val)) if idx.is_valid(i) && val.is_valid(i) => {
                let idx = idx.value(i);
                let val = val.value(i);
                SparseVector::from_pairs(
                    idx.as_primitive::<UInt32Type>()
                        .values()
                        .iter()
                        .copied()
                        .zip(val.as_primitive::<Float32Type>().values().iter().copied()),
                )
            }
            _ => SparseVector::default(),
        };
        rows.push(Row {
            chunk: DocumentChunk {
                id: ids.value(i).to_string(),
                text: texts.value(i).to_string(),
                embedding: None,
                source_document: sources.value(i).to_string(),
                start_page: start_pages.value(i).max(0) as usize,
                end_page: end_pages.value(i).max(0) as usize,
                chunk_index: chunk_indices.value(i).max(0) as usize,
                chunk_total: chunk_totals.value(i).max(0) as usize,
                section: sections.value(i).to_string(),
                section_path: section_paths.value(i).to_string(),
                metadata: meta,
            },
            sparse,
            distance: distances.filter(|d| d.is_valid(i)).map(|d| d.value(i)),
        });
    }
    Ok(rows)
}

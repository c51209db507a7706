//! The vector index protocol consumed by both pipelines.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cinesift_core::model::IndexRecord;

use crate::error::StoreResult;

/// Raw metadata map as stored next to each vector.
pub type Metadata = serde_json::Map<String, Value>;

/// A record to insert or replace, embedded by the store from `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertRecord {
    pub id: String,
    pub data: String,
    pub metadata: Metadata,
}

impl UpsertRecord {
    pub fn from_record(record: &IndexRecord) -> cinesift_core::Result<Self> {
        Ok(Self {
            id: record.key.to_string(),
            data: record.data.clone(),
            metadata: record.metadata.to_map()?,
        })
    }
}

/// A record returned by a point fetch or range scan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub data: Option<String>,
}

/// What to search with: raw text (embedded by the store) or a vector.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Text(String),
    Vector(Vec<f32>),
}

/// An approximate nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub input: QueryInput,
    pub top_k: usize,
    pub include_vectors: bool,
    pub include_metadata: bool,
    pub filter: Option<String>,
}

impl QueryRequest {
    /// Text query returning metadata but no vectors.
    #[must_use]
    pub fn text(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            input: QueryInput::Text(query.into()),
            top_k,
            include_vectors: false,
            include_metadata: true,
            filter: None,
        }
    }

    /// Restrict matches with a metadata filter expression
    /// (e.g. `popularity = 0`).
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// A ranked query hit. `score` is a similarity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Match {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// One page of a cursor-based range scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRequest {
    pub cursor: String,
    pub limit: usize,
    pub include_vectors: bool,
    pub include_metadata: bool,
}

impl RangeRequest {
    /// Metadata-only page starting at `cursor`.
    #[must_use]
    pub fn metadata(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: cursor.into(),
            limit,
            include_vectors: false,
            include_metadata: true,
        }
    }
}

/// Records in one range page and the cursor for the next one, `None`
/// once the scan is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangePage {
    pub vectors: Vec<StoredRecord>,
    pub next_cursor: Option<String>,
}

/// A key-value + nearest-neighbour vector index.
#[async_trait]
pub trait VectorStore: Send + Sync + fmt::Debug {
    /// Insert or replace a record.
    async fn upsert(&self, record: UpsertRecord) -> StoreResult<()>;

    /// Point-fetch records; the result has one slot per id, in order.
    async fn fetch(&self, ids: &[String]) -> StoreResult<Vec<Option<StoredRecord>>>;

    /// Nearest-neighbour query, best match first.
    async fn query(&self, request: QueryRequest) -> StoreResult<Vec<Match>>;

    /// Replace the metadata of an existing record.
    async fn update(&self, id: &str, metadata: Metadata) -> StoreResult<()>;

    /// Scan the index in key order starting at a cursor.
    async fn range(&self, request: RangeRequest) -> StoreResult<RangePage>;
}

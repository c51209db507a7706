//! Upstash Vector REST client.
//!
//! Every endpoint is a `POST` with a JSON body and a bearer token. Replies
//! are wrapped as `{"result": ...}` on success or `{"error": ...}` on
//! failure. Text is embedded server-side, so upserts and text queries go
//! to the `*-data` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use cinesift_core::resilience::RetryPolicy;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    Match, Metadata, QueryInput, QueryRequest, RangePage, RangeRequest, StoredRecord,
    UpsertRecord, VectorStore,
};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeResult {
    #[serde(default)]
    next_cursor: String,
    #[serde(default)]
    vectors: Vec<StoredRecord>,
}

#[derive(Debug, Deserialize)]
struct UpdateResult {
    updated: u64,
}

/// Client for an Upstash Vector index.
#[derive(Debug, Clone)]
pub struct UpstashIndex {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl UpstashIndex {
    /// Create a client for the index at `url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> StoreResult<Self> {
        let http = Client::builder()
            .user_agent("cinesift/0.1.0 (https://github.com/cinesift/cinesift)")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the retry policy applied to every call.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post(&self, path: &str, body: &Value) -> StoreResult<Value> {
        self.retry
            .run(path, move || self.post_once(path, body))
            .await
    }

    async fn post_once(&self, path: &str, body: &Value) -> StoreResult<Value> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or(text);
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope =
            serde_json::from_str(&text).map_err(|e| StoreError::Parse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(StoreError::Api(error));
        }

        envelope
            .result
            .ok_or_else(|| StoreError::UnexpectedShape(format!("`{path}` reply has no result")))
    }
}

#[async_trait]
impl VectorStore for UpstashIndex {
    async fn upsert(&self, record: UpsertRecord) -> StoreResult<()> {
        let body = json!({
            "id": record.id,
            "data": record.data,
            "metadata": record.metadata,
        });
        self.post("upsert-data", &body).await?;
        Ok(())
    }

    async fn fetch(&self, ids: &[String]) -> StoreResult<Vec<Option<StoredRecord>>> {
        let body = json!({
            "ids": ids,
            "includeMetadata": true,
            "includeVectors": false,
            "includeData": false,
        });
        let result = self.post("fetch", &body).await?;
        let records: Vec<Option<StoredRecord>> =
            serde_json::from_value(result).map_err(|e| StoreError::Parse(e.to_string()))?;

        if records.len() != ids.len() {
            return Err(StoreError::UnexpectedShape(format!(
                "fetch returned {} slots for {} ids",
                records.len(),
                ids.len()
            )));
        }
        Ok(records)
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<Vec<Match>> {
        let (path, mut body) = match request.input {
            QueryInput::Text(text) => ("query-data", json!({ "data": text })),
            QueryInput::Vector(vector) => ("query", json!({ "vector": vector })),
        };
        body["topK"] = json!(request.top_k);
        body["includeVectors"] = json!(request.include_vectors);
        body["includeMetadata"] = json!(request.include_metadata);
        if let Some(filter) = request.filter {
            body["filter"] = json!(filter);
        }

        match self.post(path, &body).await? {
            matches @ Value::Array(_) => {
                serde_json::from_value(matches).map_err(|e| StoreError::Parse(e.to_string()))
            }
            other => Err(StoreError::UnexpectedShape(format!(
                "query result is not an array: {other}"
            ))),
        }
    }

    async fn update(&self, id: &str, metadata: Metadata) -> StoreResult<()> {
        let body = json!({
            "id": id,
            "metadata": metadata,
        });
        let result = self.post("update", &body).await?;
        let outcome: UpdateResult =
            serde_json::from_value(result).map_err(|e| StoreError::Parse(e.to_string()))?;

        if outcome.updated == 0 {
            return Err(StoreError::Api(format!("no record with id {id}")));
        }
        Ok(())
    }

    async fn range(&self, request: RangeRequest) -> StoreResult<RangePage> {
        let body = json!({
            "cursor": request.cursor,
            "limit": request.limit,
            "includeVectors": request.include_vectors,
            "includeMetadata": request.include_metadata,
        });
        let result = self.post("range", &body).await?;
        let page: RangeResult =
            serde_json::from_value(result).map_err(|e| StoreError::Parse(e.to_string()))?;

        Ok(RangePage {
            vectors: page.vectors,
            next_cursor: Some(page.next_cursor).filter(|cursor| !cursor.is_empty()),
        })
    }
}

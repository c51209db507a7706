//! Metadata backfill.
//!
//! Refreshes `popularity` and `adult` on records already in the index.
//! The rest of each record's metadata is preserved: the new values are
//! merged into the stored map before it is written back.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cinesift_core::model::RecordKey;
use cinesift_search::{Metadata, QueryRequest, RangeRequest, VectorStore};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::EtlResult;
use crate::tmdb::CatalogSource;

const JOB: &str = "backfill";

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_SENTINEL_FILTER: &str = "popularity = 0";
pub const DEFAULT_SENTINEL_PROBE: &str =
    "series about an adventure of a hobbit in a fantasy world.";
pub const DEFAULT_SENTINEL_BATCH: usize = 10;

/// Largest `top_k` a sentinel query may ask for.
pub const MAX_SENTINEL_TOP_K: usize = 1000;

/// How records needing a refresh are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillMode {
    /// Walk the whole index in key order.
    Scan { cursor: String, page_size: usize },
    /// Repeatedly query for records matching `filter` until none are left.
    Sentinel {
        probe: String,
        filter: String,
        batch: usize,
    },
}

impl BackfillMode {
    /// Full scan from the start of the index.
    pub fn scan() -> Self {
        Self::Scan {
            cursor: "0".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Query for records that were never given a popularity.
    pub fn sentinel() -> Self {
        Self::Sentinel {
            probe: DEFAULT_SENTINEL_PROBE.to_string(),
            filter: DEFAULT_SENTINEL_FILTER.to_string(),
            batch: DEFAULT_SENTINEL_BATCH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    Updated,
    Skipped,
    Failed,
}

/// Totals for one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub visited: usize,
    pub updated: usize,
    /// Records whose key is not a catalog key.
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BackfillReport {
    fn record(&mut self, refresh: Refresh) {
        self.visited += 1;
        match refresh {
            Refresh::Updated => self.updated += 1,
            Refresh::Skipped => self.skipped += 1,
            Refresh::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} visited: {} updated, {} skipped, {} failed",
            self.visited, self.updated, self.skipped, self.failed
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// Refreshes popularity and the adult flag from the catalog.
#[derive(Debug, Clone)]
pub struct Backfiller {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn VectorStore>,
    workers: usize,
    checkpoints: Option<CheckpointStore>,
}

impl Backfiller {
    pub fn new(catalog: Arc<dyn CatalogSource>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            catalog,
            store,
            workers: 4,
            checkpoints: None,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Save the scan cursor after each page.
    #[must_use]
    pub fn with_checkpoints(mut self, checkpoints: CheckpointStore) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    /// Run a backfill. Store failures while listing records end the run
    /// with an error; per-record failures are counted.
    pub async fn run(
        &self,
        mode: BackfillMode,
        resume: bool,
        cancel: &CancellationToken,
    ) -> EtlResult<BackfillReport> {
        match mode {
            BackfillMode::Scan { cursor, page_size } => {
                self.scan(cursor, page_size, resume, cancel).await
            }
            BackfillMode::Sentinel {
                probe,
                filter,
                batch,
            } => self.sentinel(&probe, &filter, batch, cancel).await,
        }
    }

    async fn scan(
        &self,
        cursor: String,
        page_size: usize,
        resume: bool,
        cancel: &CancellationToken,
    ) -> EtlResult<BackfillReport> {
        let run_id = Uuid::new_v4();
        let mut report = BackfillReport::default();
        let mut cursor = cursor;

        if resume {
            if let Some(checkpoints) = &self.checkpoints {
                if let Some(saved) = checkpoints.load(JOB)?.and_then(|c| c.cursor) {
                    log::info!("Resuming backfill at cursor {}", saved);
                    cursor = saved;
                }
            }
        }

        loop {
            if cancel.is_cancelled() {
                log::info!("Backfill cancelled at cursor {}", cursor);
                report.cancelled = true;
                return Ok(report);
            }

            let page = self
                .store
                .range(RangeRequest::metadata(cursor.clone(), page_size))
                .await?;
            log::info!(
                "Backfilling {} records from cursor {}",
                page.vectors.len(),
                cursor
            );

            let batch = page
                .vectors
                .into_iter()
                .map(|record| (record.id, record.metadata))
                .collect();
            for refresh in self.refresh_all(batch).await {
                report.record(refresh);
            }

            let Some(next) = page.next_cursor else {
                break;
            };
            if let Some(checkpoints) = &self.checkpoints {
                checkpoints.save(&Checkpoint::cursor(JOB, run_id, next.clone()))?;
            }
            cursor = next;
        }

        if let Some(checkpoints) = &self.checkpoints {
            checkpoints.clear(JOB)?;
        }

        log::info!("Completed metadata backfill: {}", report);
        Ok(report)
    }

    async fn sentinel(
        &self,
        probe: &str,
        filter: &str,
        batch: usize,
        cancel: &CancellationToken,
    ) -> EtlResult<BackfillReport> {
        let mut report = BackfillReport::default();
        let mut seen = HashSet::new();

        loop {
            if cancel.is_cancelled() {
                log::info!("Backfill cancelled after {} records", report.visited);
                report.cancelled = true;
                return Ok(report);
            }

            // Records that could not be refreshed keep matching the filter,
            // so each round asks for enough hits to reach past all of them.
            let top_k = (batch.max(1) + seen.len()).min(MAX_SENTINEL_TOP_K);
            let request = QueryRequest::text(probe, top_k).with_filter(filter);
            let matches = self.store.query(request).await?;
            if matches.is_empty() {
                break;
            }

            let fresh: Vec<(String, Option<Metadata>)> = matches
                .into_iter()
                .filter(|hit| seen.insert(hit.id.clone()))
                .map(|hit| (hit.id, hit.metadata))
                .collect();
            if fresh.is_empty() {
                if top_k == MAX_SENTINEL_TOP_K {
                    log::warn!(
                        "The first {} records matching `{}` were all visited, stopping",
                        top_k,
                        filter
                    );
                } else {
                    log::info!("Only already-visited records still match `{}`", filter);
                }
                break;
            }

            for refresh in self.refresh_all(fresh).await {
                report.record(refresh);
            }
        }

        log::info!("Completed metadata backfill: {}", report);
        Ok(report)
    }

    async fn refresh_all(&self, records: Vec<(String, Option<Metadata>)>) -> Vec<Refresh> {
        stream::iter(records)
            .map(|(id, metadata)| self.refresh(id, metadata))
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    async fn refresh(&self, id: String, metadata: Option<Metadata>) -> Refresh {
        let key: RecordKey = match id.parse() {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Skipping {}: {}", id, e);
                return Refresh::Skipped;
            }
        };

        let details = match self.catalog.details(key.kind, key.source_id).await {
            Ok(details) => details,
            Err(e) => {
                log::warn!("Failed to fetch details for {}: {}", id, e);
                return Refresh::Failed;
            }
        };

        let mut merged = metadata.unwrap_or_default();
        merged.insert("popularity".to_string(), json!(details.popularity));
        merged.insert("adult".to_string(), json!(details.adult));
        let name = merged
            .get("name")
            .and_then(|name| name.as_str())
            .unwrap_or(id.as_str())
            .to_string();

        match self.store.update(&id, merged).await {
            Ok(()) => {
                log::info!(
                    "Updated {} (popularity {}, adult {})",
                    name,
                    details.popularity,
                    details.adult
                );
                Refresh::Updated
            }
            Err(e) => {
                log::error!("Failed to update {} in the index: {}", name, e);
                Refresh::Failed
            }
        }
    }
}

//! Catalog ingestion driver.
//!
//! Walks a catalog listing page by page. Items on a page are handled by a
//! bounded pool of concurrent tasks; each task checks the index for the
//! item's key, and only absent items are enriched, composed and upserted.
//! Lookup failures fall back to placeholder values and a failed upsert is
//! counted, never fatal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cinesift_core::model::{
    imdb_link, CatalogItem, Credits, Enrichment, IndexRecord, MediaKind,
};
use cinesift_search::{UpsertRecord, VectorStore};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::enrich::Enricher;
use crate::error::EtlResult;
use crate::tmdb::{CatalogPage, CatalogSource};

/// What to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPlan {
    /// Movies listed per release year, `from_year..=to_year`.
    Movies { from_year: i32, to_year: i32 },
    /// The top-rated TV listing.
    TopRatedTv,
}

/// One independently paginated listing within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Year(i32),
    TopRated,
}

impl Unit {
    const fn checkpoint_key(self) -> Option<i32> {
        match self {
            Self::Year(year) => Some(year),
            Self::TopRated => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "year {year}"),
            Self::TopRated => f.write_str("top rated"),
        }
    }
}

impl IngestPlan {
    pub const fn kind(&self) -> MediaKind {
        match self {
            Self::Movies { .. } => MediaKind::Movie,
            Self::TopRatedTv => MediaKind::Tv,
        }
    }

    /// Checkpoint job name.
    pub const fn job(&self) -> &'static str {
        match self {
            Self::Movies { .. } => "movies",
            Self::TopRatedTv => "tv",
        }
    }

    fn units(&self) -> Vec<Unit> {
        match *self {
            Self::Movies { from_year, to_year } => (from_year..=to_year).map(Unit::Year).collect(),
            Self::TopRatedTv => vec![Unit::TopRated],
        }
    }
}

/// Per-run knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Page the first unit starts at; later units start at 1.
    pub start_page: u32,
    /// Continue from the saved checkpoint when there is one.
    pub resume: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            start_page: 1,
            resume: false,
        }
    }
}

/// What happened to a single catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    /// The key was already in the index.
    Skipped,
    Failed,
}

/// Totals for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub pages: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub page_failures: usize,
    pub cancelled: bool,
}

impl IngestReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Inserted => self.inserted += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages: {} inserted, {} skipped, {} failed, {} page failures",
            self.pages, self.inserted, self.skipped, self.failed, self.page_failures
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// Drives catalog pages into the vector index.
#[derive(Debug, Clone)]
pub struct Ingestor {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn VectorStore>,
    enricher: Enricher,
    image_base: String,
    workers: usize,
    checkpoints: Option<CheckpointStore>,
}

impl Ingestor {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn VectorStore>,
        enricher: Enricher,
        image_base: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            store,
            enricher,
            image_base: image_base.into(),
            workers: 4,
            checkpoints: None,
        }
    }

    /// Number of items processed concurrently (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_checkpoints(mut self, checkpoints: CheckpointStore) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    /// Run `plan` until every page is processed or `cancel` fires.
    ///
    /// Only checkpoint I/O errors abort a run; upstream failures are
    /// absorbed and counted in the report.
    pub async fn run(
        &self,
        plan: IngestPlan,
        options: IngestOptions,
        cancel: &CancellationToken,
    ) -> EtlResult<IngestReport> {
        let run_id = Uuid::new_v4();
        let mut report = IngestReport::default();
        let mut units = plan.units();
        let mut start_page = options.start_page.max(1);

        if units.is_empty() {
            log::warn!("Nothing to ingest for {:?}", plan);
            return Ok(report);
        }

        if options.resume {
            if let Some((skip, page)) = self.resume_point(plan, &units)? {
                units = units.split_off(skip);
                start_page = page;
            }
        }

        let kind = plan.kind();
        let genres = match self.catalog.genres(kind).await {
            Ok(genres) => genres,
            Err(e) => {
                log::warn!("Failed to fetch {} genres, genre names will be empty: {}", kind, e);
                HashMap::new()
            }
        };

        log::info!("Starting {} ingestion run {}", plan.job(), run_id);

        for unit in units {
            let mut page = start_page;
            start_page = 1;

            loop {
                if cancel.is_cancelled() {
                    log::info!("Ingestion cancelled before {} page {}", unit, page);
                    report.cancelled = true;
                    return Ok(report);
                }

                let listing = match self.fetch_page(unit, page).await {
                    Ok(listing) => listing,
                    Err(e) => {
                        log::error!("Failed to fetch {} page {}, moving on: {}", unit, page, e);
                        report.page_failures += 1;
                        break;
                    }
                };

                if listing.items.is_empty() {
                    log::info!("No items for {}, page {}", unit, page);
                } else {
                    log::info!(
                        "Processing {}, page {} of {} ({} items)",
                        unit,
                        page,
                        listing.total_pages,
                        listing.items.len()
                    );
                }

                for outcome in self.process_page(listing.items, &genres).await {
                    report.record(outcome);
                }
                report.pages += 1;

                let next_page = page + 1;
                if let Some(checkpoints) = &self.checkpoints {
                    checkpoints.save(&Checkpoint::page(
                        plan.job(),
                        run_id,
                        unit.checkpoint_key(),
                        next_page,
                    ))?;
                }

                if next_page > listing.total_pages {
                    break;
                }
                page = next_page;
            }
        }

        if let Some(checkpoints) = &self.checkpoints {
            checkpoints.clear(plan.job())?;
        }

        log::info!("Finished {} ingestion: {}", plan.job(), report);
        Ok(report)
    }

    /// Units to skip and the page to start at, from a saved checkpoint.
    fn resume_point(&self, plan: IngestPlan, units: &[Unit]) -> EtlResult<Option<(usize, u32)>> {
        let Some(checkpoints) = &self.checkpoints else {
            log::warn!("Resume requested but no checkpoint directory is configured");
            return Ok(None);
        };
        let Some(checkpoint) = checkpoints.load(plan.job())? else {
            log::info!("No {} checkpoint found, starting fresh", plan.job());
            return Ok(None);
        };

        match units
            .iter()
            .position(|unit| unit.checkpoint_key() == checkpoint.unit)
        {
            Some(skip) => {
                log::info!(
                    "Resuming {} run {} at {}, page {}",
                    plan.job(),
                    checkpoint.run_id,
                    units[skip],
                    checkpoint.next_page
                );
                Ok(Some((skip, checkpoint.next_page.max(1))))
            }
            None => {
                log::warn!(
                    "{} checkpoint does not match the requested range, starting fresh",
                    plan.job()
                );
                Ok(None)
            }
        }
    }

    async fn fetch_page(&self, unit: Unit, page: u32) -> EtlResult<CatalogPage> {
        match unit {
            Unit::Year(year) => self.catalog.discover_movies(year, page).await,
            Unit::TopRated => self.catalog.top_rated_tv(page).await,
        }
    }

    async fn process_page(
        &self,
        items: Vec<CatalogItem>,
        genres: &HashMap<u32, String>,
    ) -> Vec<ItemOutcome> {
        stream::iter(items)
            .map(|item| self.ingest_item(item, genres))
            .buffer_unordered(self.workers)
            .collect()
            .await
    }

    /// Check, enrich, compose and upsert a single item.
    pub async fn ingest_item(
        &self,
        item: CatalogItem,
        genres: &HashMap<u32, String>,
    ) -> ItemOutcome {
        let key = item.key();
        let id = key.to_string();

        match self.store.fetch(std::slice::from_ref(&id)).await {
            Ok(records) if records.first().is_some_and(Option::is_some) => {
                log::debug!("{} ({}) already indexed, skipping", item.title, id);
                return ItemOutcome::Skipped;
            }
            Ok(_) => {}
            Err(e) => log::warn!("Existence check for {} failed, treating as new: {}", id, e),
        }

        let enrichment = self.enricher.enrich(&item).await;

        let credits = match self.catalog.credits(item.kind, item.id).await {
            Ok(credits) => credits,
            Err(e) => {
                log::warn!("Failed to fetch credits for {}: {}", id, e);
                Credits::unavailable()
            }
        };

        let imdb = match self.catalog.details(item.kind, item.id).await {
            Ok(details) => imdb_link(details.imdb_id.as_deref()),
            Err(e) => {
                log::warn!("Failed to fetch IMDb id for {}: {}", id, e);
                imdb_link(None)
            }
        };

        let upsert = match self.compose(&item, &enrichment, &credits, genres, imdb) {
            Ok(upsert) => upsert,
            Err(e) => {
                log::error!("Failed to compose record for {}: {}", id, e);
                return ItemOutcome::Failed;
            }
        };

        match self.store.upsert(upsert).await {
            Ok(()) => {
                log::info!("Inserted {} {} ({})", item.kind.noun(), item.title, id);
                ItemOutcome::Inserted
            }
            Err(e) => {
                log::error!("Failed to insert {} into the index: {}", id, e);
                ItemOutcome::Failed
            }
        }
    }

    fn compose(
        &self,
        item: &CatalogItem,
        enrichment: &Enrichment,
        credits: &Credits,
        genres: &HashMap<u32, String>,
        imdb: String,
    ) -> EtlResult<UpsertRecord> {
        let record =
            IndexRecord::compose(item, enrichment, credits, genres, imdb, &self.image_base)?;
        Ok(UpsertRecord::from_record(&record)?)
    }
}

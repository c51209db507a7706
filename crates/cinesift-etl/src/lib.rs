//! Ingestion pipelines for cinesift.
//!
//! Crawls the TMDB catalog, enriches each new item with generated text,
//! upserts the composed record into the vector index, and refreshes
//! popularity metadata on records already indexed.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod backfill;
pub mod checkpoint;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod tmdb;

pub use backfill::{BackfillMode, BackfillReport, Backfiller};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::Config;
pub use enrich::{ChatClient, Enricher, TextGenerator};
pub use error::{EtlError, EtlResult};
pub use ingest::{IngestOptions, IngestPlan, IngestReport, Ingestor, ItemOutcome};
pub use tmdb::{CatalogPage, CatalogSource, ItemDetails, TmdbClient};

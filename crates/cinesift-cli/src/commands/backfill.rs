use anyhow::Result;
use cinesift_etl::backfill::{
    DEFAULT_PAGE_SIZE, DEFAULT_SENTINEL_BATCH, DEFAULT_SENTINEL_FILTER, DEFAULT_SENTINEL_PROBE,
};
use cinesift_etl::{BackfillMode, Backfiller, CheckpointStore, Config};
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args)]
pub struct BackfillArgs {
    /// Range cursor to start the scan at
    #[arg(long, default_value = "0", conflicts_with = "sentinel")]
    cursor: String,

    /// Records per range page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Continue the scan from the last saved cursor
    #[arg(long, conflicts_with = "sentinel")]
    resume: bool,

    /// Query for records matching --filter instead of scanning
    #[arg(long)]
    sentinel: bool,

    /// Metadata filter selecting records to refresh
    #[arg(long, default_value = DEFAULT_SENTINEL_FILTER, requires = "sentinel")]
    filter: String,

    /// Query text used to reach filtered records
    #[arg(long, default_value = DEFAULT_SENTINEL_PROBE, requires = "sentinel")]
    probe: String,

    /// Records fetched per sentinel query
    #[arg(long, default_value_t = DEFAULT_SENTINEL_BATCH, requires = "sentinel")]
    batch: usize,

    /// Records refreshed concurrently (default: `workers` from config)
    #[arg(long)]
    workers: Option<usize>,
}

impl BackfillArgs {
    fn mode(self) -> BackfillMode {
        if self.sentinel {
            BackfillMode::Sentinel {
                probe: self.probe,
                filter: self.filter,
                batch: self.batch,
            }
        } else {
            BackfillMode::Scan {
                cursor: self.cursor,
                page_size: self.page_size,
            }
        }
    }
}

pub async fn run(config: &Config, args: BackfillArgs, cancel: &CancellationToken) -> Result<()> {
    let store = super::vector_store(config)?;
    let catalog = super::tmdb_client(config)?;
    let resume = args.resume;
    let workers = args.workers.unwrap_or(config.workers);
    let mode = args.mode();

    let backfiller = Backfiller::new(catalog, store)
        .with_workers(workers)
        .with_checkpoints(CheckpointStore::new(config.checkpoint_dir.clone()));

    match &mode {
        BackfillMode::Scan { cursor, .. } => println!("Scanning the index from cursor {cursor}"),
        BackfillMode::Sentinel { filter, .. } => {
            println!("Refreshing records matching `{filter}`");
        }
    }

    let report = backfiller.run(mode, resume, cancel).await?;
    println!("\n✓ {}", report);

    Ok(())
}

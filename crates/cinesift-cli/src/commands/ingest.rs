use std::sync::Arc;

use anyhow::Result;
use chrono::Datelike;
use cinesift_etl::{
    ChatClient, CheckpointStore, Config, Enricher, IngestOptions, IngestPlan, Ingestor,
};
use tokio_util::sync::CancellationToken;

/// First release year crawled when `--from-year` is not given.
const DEFAULT_FROM_YEAR: i32 = 2020;

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Page to start the first listing at
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Continue from the last checkpoint
    #[arg(long)]
    resume: bool,

    /// Items processed concurrently (default: `workers` from config)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Target {
    /// Movies by release year, most popular first
    Movies {
        /// First release year (default: 2020)
        #[arg(long)]
        from_year: Option<i32>,

        /// Last release year (default: current year)
        #[arg(long)]
        to_year: Option<i32>,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Top-rated TV series
    Tv {
        #[command(flatten)]
        run: RunArgs,
    },
}

pub async fn run(config: &Config, target: Target, cancel: &CancellationToken) -> Result<()> {
    let (plan, args) = match target {
        Target::Movies {
            from_year,
            to_year,
            run,
        } => {
            let plan = IngestPlan::Movies {
                from_year: from_year.unwrap_or(DEFAULT_FROM_YEAR),
                to_year: to_year.unwrap_or_else(|| chrono::Local::now().year()),
            };
            (plan, run)
        }
        Target::Tv { run } => (IngestPlan::TopRatedTv, run),
    };

    let store = super::vector_store(config)?;
    let catalog = super::tmdb_client(config)?;
    let chat = ChatClient::new(
        config.llm_url.clone(),
        config.require_llm_token()?,
        config.llm_model.clone(),
    )?
    .with_retry(config.retry);

    let workers = args.workers.unwrap_or(config.workers);
    println!(
        "Ingesting {} with {} workers (model: {})",
        plan.job(),
        workers.max(1),
        chat.model()
    );

    let enricher = Enricher::new(Arc::new(chat));
    let ingestor = Ingestor::new(catalog, store, enricher, config.image_base_url.clone())
        .with_workers(workers)
        .with_checkpoints(CheckpointStore::new(config.checkpoint_dir.clone()));

    let options = IngestOptions {
        start_page: args.start_page,
        resume: args.resume,
    };
    let report = ingestor.run(plan, options, cancel).await?;

    println!("\n✓ {}", report);
    if report.cancelled {
        println!("  Run again with --resume to continue where this run stopped.");
    }

    Ok(())
}

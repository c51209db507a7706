use anyhow::{Context, Result};
use clap::Parser;
use cinesift_etl::Config;
use tokio_util::sync::CancellationToken;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cinesift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Crawl TMDB and add new titles to the vector index
    ///
    /// Each page of the listing is fetched from TMDB and its items are
    /// processed by a small pool of workers. For every item:
    ///
    /// - Skips it if its key (movie:<id> or tv:<id>) is already indexed
    /// - Asks the text-generation service for a summary, keywords and abstract
    /// - Looks up the top-billed cast, the director and the IMDb id
    /// - Upserts the combined record into the index
    ///
    /// Failed lookups fall back to placeholder values; a failed upsert is
    /// reported in the summary. Progress is checkpointed after every page,
    /// so an interrupted run can continue with --resume.
    Ingest {
        #[command(subcommand)]
        target: commands::ingest::Target,
    },
    /// Refresh popularity and adult flags on indexed records
    ///
    /// By default walks the whole index with a range scan. With --sentinel,
    /// repeatedly queries for records matching a filter (popularity = 0)
    /// until none are left.
    Backfill(commands::backfill::BackfillArgs),
    /// Search the index and print ranked results
    Search(commands::search::SearchArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the current effective configuration
    Show,
    /// Get a config value (or print the whole config file)
    Get {
        /// Config key to read
        key: Option<String>,
    },
    /// Set a config value in the config file
    Set {
        /// Config key to set
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

/// Install the twyg logger from the `logging` section of the config.
fn setup_logging(config: &Config) -> Result<()> {
    twyg::setup(config.logging.clone())
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {e:?}"))
}

/// A token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the current page before stopping");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    setup_logging(&config)?;

    match cli.command {
        Commands::Ingest { target } => {
            commands::ingest::run(&config, target, &cancel_on_ctrl_c()).await?;
        }
        Commands::Backfill(args) => {
            commands::backfill::run(&config, args, &cancel_on_ctrl_c()).await?;
        }
        Commands::Search(args) => {
            commands::search::run(&config, args, &cancel_on_ctrl_c()).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Get { key } => commands::config::get_config(&config, key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

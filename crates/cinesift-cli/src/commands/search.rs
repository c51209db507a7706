use anyhow::{Context, Result};
use cinesift_etl::Config;
use cinesift_search::engine::{MIN_QUERY_CHARS, TOP_K};
use cinesift_search::{ResultCode, ScoredResult, SearchEngine, SearchOutcome};
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Free-text query, e.g. "heist movie with a twist ending"
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Print the outcome as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Show at most this many results
    #[arg(long)]
    limit: Option<usize>,

    /// Matches requested from the index before filtering and ranking
    #[arg(long, default_value_t = TOP_K)]
    top_k: usize,
}

pub async fn run(config: &Config, args: SearchArgs, cancel: &CancellationToken) -> Result<()> {
    let store = super::vector_store(config)?;
    let engine = SearchEngine::new(store).with_top_k(args.top_k);
    let query = args.query.join(" ");

    let Some(mut outcome) = engine.search_until_cancelled(&query, cancel).await else {
        println!("Search cancelled.");
        return Ok(());
    };

    if let Some(limit) = args.limit {
        outcome.data.truncate(limit);
    }

    if args.json {
        let body = serde_json::to_string_pretty(&outcome).context("Failed to encode results")?;
        println!("{body}");
        return Ok(());
    }

    print_outcome(&query, &outcome)
}

fn print_outcome(query: &str, outcome: &SearchOutcome) -> Result<()> {
    match outcome.code {
        ResultCode::MinLengthError => {
            anyhow::bail!("Query must be at least {MIN_QUERY_CHARS} characters")
        }
        ResultCode::UnknownError => {
            anyhow::bail!("Search failed; see the log for details")
        }
        ResultCode::Empty | ResultCode::Success => {}
    }

    if outcome.data.is_empty() {
        println!("No results for \"{}\"", query.trim());
        return Ok(());
    }

    println!("\n🎬 {} results for \"{}\"\n", outcome.data.len(), query.trim());
    println!(
        "  {:>3}  {:<40} {:>4}  {:>6}  {:>8}  {:>5}  {:>5}  IMDb",
        "#", "Title", "Year", "Rating", "Popular", "Match", "Total"
    );
    for (position, result) in outcome.data.iter().enumerate() {
        println!("  {:>3}  {}", position + 1, row(result));
    }

    Ok(())
}

fn row(result: &ScoredResult) -> String {
    let meta = &result.metadata;
    format!(
        "{:<40} {:>4}  {:>6.1}  {:>8.1}  {:>5.3}  {:>5.3}  {}",
        truncate(&meta.name, 40),
        meta.release_year,
        meta.vote_average,
        meta.popularity,
        result.score,
        result.total,
        meta.imdb_link
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

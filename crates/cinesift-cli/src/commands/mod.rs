pub mod backfill;
pub mod config;
pub mod ingest;
pub mod search;

use std::sync::Arc;

use anyhow::Result;
use cinesift_etl::{Config, TmdbClient};
use cinesift_core::resilience::RateLimiter;
use cinesift_search::UpstashIndex;

/// Vector index client from the configured endpoint and token.
pub fn vector_store(config: &Config) -> Result<Arc<UpstashIndex>> {
    let index = UpstashIndex::new(config.require_vector_url()?, config.require_vector_token()?)?
        .with_retry(config.retry);
    Ok(Arc::new(index))
}

/// TMDB client sharing one rate limiter across every worker.
pub fn tmdb_client(config: &Config) -> Result<Arc<TmdbClient>> {
    let client = TmdbClient::new(config.require_tmdb_api_key()?, config.tmdb_base_url.clone())?
        .with_rate_limiter(RateLimiter::new(config.tmdb_requests_per_second))
        .with_retry(config.retry);
    Ok(Arc::new(client))
}

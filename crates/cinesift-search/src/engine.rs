//! Free-text query to ranked results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use cinesift_core::model::IndexMetadata;

use crate::rank::{self, Candidate, ScoredResult};
use crate::store::{Match, QueryRequest, VectorStore};

/// Minimum query length, in characters, after trimming.
pub const MIN_QUERY_CHARS: usize = 2;

/// Matches requested from the store per query.
pub const TOP_K: usize = 50;

/// Outcome taxonomy reported to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    /// No query has been issued yet.
    #[default]
    Empty,
    Success,
    UnknownError,
    MinLengthError,
}

/// A result code and the ranked records that go with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub code: ResultCode,
    pub data: Vec<ScoredResult>,
}

impl SearchOutcome {
    #[must_use]
    pub fn success(data: Vec<ScoredResult>) -> Self {
        Self {
            code: ResultCode::Success,
            data,
        }
    }

    #[must_use]
    pub fn failure(code: ResultCode) -> Self {
        Self {
            code,
            data: Vec::new(),
        }
    }
}

/// Stateless query/rank engine over a [`VectorStore`].
///
/// Every search is a single read-only round trip, so one engine can serve
/// any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store, top_k: TOP_K }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Run a search. Failures are reported through the outcome code.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return SearchOutcome::failure(ResultCode::MinLengthError);
        }

        let matches = match self.store.query(QueryRequest::text(query, self.top_k)).await {
            Ok(matches) => matches,
            Err(e) => {
                log::error!("Search for {:?} failed: {}", query, e);
                return SearchOutcome::failure(ResultCode::UnknownError);
            }
        };

        let returned = matches.len();
        let candidates = displayable(matches);
        log::debug!(
            "Query {:?}: {} matches, {} displayable",
            query,
            returned,
            candidates.len()
        );

        SearchOutcome::success(rank::rank(candidates))
    }

    /// Run a search unless `cancel` fires first; `None` when cancelled.
    pub async fn search_until_cancelled(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Option<SearchOutcome> {
        tokio::select! {
            () = cancel.cancelled() => {
                log::debug!("Search for {:?} cancelled", query);
                None
            }
            outcome = self.search(query) => Some(outcome),
        }
    }
}

/// Keep matches whose metadata parses and passes the display predicate,
/// in store order.
fn displayable(matches: Vec<Match>) -> Vec<Candidate> {
    matches
        .into_iter()
        .filter_map(|hit| {
            let metadata = match hit.metadata.map(IndexMetadata::from_map) {
                Some(Ok(metadata)) => metadata,
                Some(Err(e)) => {
                    log::debug!("Dropping {}: malformed metadata: {}", hit.id, e);
                    return None;
                }
                None => {
                    log::debug!("Dropping {}: no metadata", hit.id);
                    return None;
                }
            };
            metadata.is_displayable().then(|| Candidate {
                id: hit.id,
                score: hit.score,
                metadata,
            })
        })
        .collect()
}

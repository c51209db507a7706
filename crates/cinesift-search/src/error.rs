//! Vector store error types.

use cinesift_core::resilience::Transient;
use thiserror::Error;

/// Errors returned by a [`VectorStore`](crate::store::VectorStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success HTTP status.
    #[error("vector store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The store answered successfully but reported an error in the body.
    #[error("vector store error: {0}")]
    Api(String),

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A response parsed but did not have the expected structure.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Convenience alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

//! Error types for the ingestion and backfill pipelines.

use std::path::PathBuf;

use cinesift_core::resilience::Transient;
use cinesift_search::StoreError;
use thiserror::Error;

/// Errors that can occur while ingesting or refreshing catalog records.
#[derive(Debug, Error)]
pub enum EtlError {
    /// An HTTP request to an external source failed.
    #[error("HTTP {status} from {source_name}: {message}")]
    Http {
        source_name: String,
        status: u16,
        message: String,
    },

    /// The external source returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// The requested entity was not found at the external source.
    #[error("not found: {entity} at {source_name}")]
    NotFound { entity: String, source_name: String },

    /// A response from an external source could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the vector store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error propagated from the core domain layer.
    #[error("record error: {0}")]
    Record(#[from] cinesift_core::Error),

    /// A checkpoint file could not be read or written.
    #[error("checkpoint error at {}: {message}", path.display())]
    Checkpoint { path: PathBuf, message: String },

    /// A required setting is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Returns `true` when the error indicates the entity was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn checkpoint(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Checkpoint {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl Transient for EtlError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Convenience alias for pipeline results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;

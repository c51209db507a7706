//! Vector search for cinesift.
//!
//! Speaks the vector index protocol (upsert, fetch, query, update, range)
//! and turns a free-text query into a ranked list of displayable records.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod engine;
pub mod error;
pub mod rank;
pub mod store;
pub mod upstash;

pub use engine::{ResultCode, SearchEngine, SearchOutcome};
pub use error::{StoreError, StoreResult};
pub use rank::ScoredResult;
pub use store::{
    Match, Metadata, QueryInput, QueryRequest, RangePage, RangeRequest, StoredRecord,
    UpsertRecord, VectorStore,
};
pub use upstash::UpstashIndex;

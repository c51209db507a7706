//! Core data model for cinesift.
//!
//! This crate defines the records shared by the ingestion and search
//! pipelines (catalog items, enrichment results, index records and their
//! metadata), the read-time display invariant, and the resilience
//! primitives used by every network client.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod resilience;

pub use error::{Error, Result};

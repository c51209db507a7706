//! Text enrichment.
//!
//! Asks a text-generation service for a summary, five keywords and a
//! one-sentence abstract per catalog item, and recovers the requested
//! JSON object from whatever prose surrounds it.

pub mod chat;
pub mod enricher;
pub mod lenient;

pub use chat::{ChatClient, TextGenerator};
pub use enricher::Enricher;

use serde::{Deserialize, Serialize};

pub const SUMMARY_UNAVAILABLE: &str = "Summary not available";
pub const ABSTRACT_UNAVAILABLE: &str = "Abstract not available";

/// Generated text attached to a catalog item.
///
/// The serde shape is the schema the text-generation service is asked to
/// produce: `{"summary": string, "keywords": [string], "abstract": string}`.
/// All three fields are required; extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub summary: String,
    pub keywords: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl Enrichment {
    /// Sentinel result substituted whenever enrichment fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            summary: SUMMARY_UNAVAILABLE.to_string(),
            keywords: Vec::new(),
            abstract_text: ABSTRACT_UNAVAILABLE.to_string(),
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        *self == Self::unavailable()
    }
}

impl Default for Enrichment {
    fn default() -> Self {
        Self::unavailable()
    }
}

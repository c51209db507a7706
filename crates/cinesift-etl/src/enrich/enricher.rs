use std::sync::Arc;

use cinesift_core::model::{CatalogItem, Enrichment};

use super::chat::TextGenerator;
use super::lenient;

/// Builds enrichment prompts and absorbs every failure into the
/// unavailable sentinel.
#[derive(Debug, Clone)]
pub struct Enricher {
    generator: Arc<dyn TextGenerator>,
}

impl Enricher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// The prompt asking for `{summary, keywords, abstract}` about `item`.
    pub fn prompt(item: &CatalogItem) -> String {
        let noun = item.kind.noun();
        format!(
            r#"Provide a JSON object with the following structure:
{{
  "summary": "string",
  "keywords": ["string"],
  "abstract": "string"
}}.
Summarize the {noun}: {title} - {overview}. Limit the response to 1500 characters. Also, provide 5 keywords about the {noun}, separated by commas. Finally, give a single-sentence abstract of what the {noun} is about. Return only the JSON object."#,
            noun = noun,
            title = item.title,
            overview = item.overview,
        )
    }

    /// Generate text for `item`, falling back to [`Enrichment::unavailable`]
    /// when the call fails or the reply holds no valid object.
    pub async fn enrich(&self, item: &CatalogItem) -> Enrichment {
        let reply = match self.generator.generate(&Self::prompt(item)).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Enrichment request for {} failed: {}", item.key(), e);
                return Enrichment::unavailable();
            }
        };

        lenient::parse_enrichment(&reply).unwrap_or_else(|| {
            log::warn!(
                "Enrichment reply for {} had no valid JSON object, using placeholders",
                item.key()
            );
            Enrichment::unavailable()
        })
    }
}

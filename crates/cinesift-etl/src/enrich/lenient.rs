//! Pull a JSON object out of free-form model output.
//!
//! Models wrap the requested object in prose, code fences or trailing
//! notes. The extractor scans for the first `{` and returns the text up to
//! its matching `}`, skipping braces inside string literals.

use cinesift_core::model::Enrichment;

/// The first balanced top-level `{...}` in `text`, or `None` when no
/// object opens or the first one never closes.
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract an [`Enrichment`] from model output, `None` if no object is
/// present or it does not match `{summary: string, keywords: string[],
/// abstract: string}`.
pub fn parse_enrichment(text: &str) -> Option<Enrichment> {
    let object = extract_object(text)?;
    match serde_json::from_str(object) {
        Ok(enrichment) => Some(enrichment),
        Err(e) => {
            log::debug!("Enrichment object rejected: {}", e);
            None
        }
    }
}

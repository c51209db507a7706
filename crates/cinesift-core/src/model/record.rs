//! Records written to and read from the vector index.
//!
//! An [`IndexRecord`] pairs the opaque payload text the index embeds (a
//! serialised [`IndexDocument`]) with the structured [`IndexMetadata`]
//! returned alongside every match. Display eligibility is decided on read
//! via [`IndexMetadata::is_displayable`]; records that fail it may still
//! exist in the index.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::catalog::{CatalogItem, Credits};
use super::enrichment::Enrichment;
use super::key::{MediaKind, RecordKey};
use crate::error::{Error, Result};

/// Placeholder stored when no IMDb id could be resolved.
pub const IMDB_LINK_UNAVAILABLE: &str = "IMDb link not available";

const IMDB_TITLE_BASE: &str = "https://www.imdb.com/title";

/// Structured metadata stored next to each vector.
///
/// Fields written by older loaders are accepted on read (`first_air_year`
/// for TV records, numeric release years, missing `popularity`/`adult`).
/// Unknown fields are carried in `extra` so a read-modify-write cycle
/// never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        alias = "first_air_year",
        deserialize_with = "string_or_number"
    )]
    pub release_year: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub vote_count: u64,
    #[serde(default)]
    pub imdb_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_link: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub adult: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexMetadata {
    /// Whether a record carrying this metadata may be shown to users.
    ///
    /// The poster link must be present and must not end in the literal
    /// `"null"` (what a missing poster path renders to), and the IMDb link
    /// must not be the unavailable sentinel.
    #[must_use]
    pub fn is_displayable(&self) -> bool {
        let has_poster = self
            .poster_link
            .as_deref()
            .is_some_and(|link| !link.ends_with("null"));
        has_poster && self.imdb_link != IMDB_LINK_UNAVAILABLE
    }

    /// Parse metadata from the raw map returned by the index.
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Convert to the raw map sent to the index.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidData(format!(
                "metadata serialised to a non-object: {other}"
            ))),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

/// A non-negative count written as an integer, a float or a string.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match &value {
        Value::Null => Some(0),
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_count)),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
        }
        _ => None,
    };
    count.ok_or_else(|| serde::de::Error::custom(format!("expected a count, got {value}")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_count(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value < u64::MAX as f64).then(|| value.round() as u64)
}

/// Year portion of a `YYYY-MM-DD` date; empty for an empty date.
#[must_use]
pub fn release_year(date: &str) -> String {
    date.split('-').next().unwrap_or(date).to_string()
}

/// Full poster URL for a poster path, `None` when the path is missing.
#[must_use]
pub fn poster_link(image_base: &str, poster_path: Option<&str>) -> Option<String> {
    poster_path.filter(|path| !path.is_empty()).map(|path| {
        format!(
            "{}/{}",
            image_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    })
}

/// IMDb permalink for an IMDb id, or the unavailable sentinel.
#[must_use]
pub fn imdb_link(imdb_id: Option<&str>) -> String {
    match imdb_id.filter(|id| !id.is_empty()) {
        Some(id) => format!("{IMDB_TITLE_BASE}/{id}/"),
        None => IMDB_LINK_UNAVAILABLE.to_string(),
    }
}

/// The payload text the index embeds, before serialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub poster_path: Option<String>,
    pub overview: String,
    pub genres: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    pub cast: String,
    pub summary: String,
    pub keywords: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// A fully composed record ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub key: RecordKey,
    pub data: String,
    pub metadata: IndexMetadata,
}

impl IndexRecord {
    /// Combine a catalog item with its enrichment and auxiliary lookups.
    ///
    /// Genre ids missing from `genres` are left out of the genre line.
    pub fn compose(
        item: &CatalogItem,
        enrichment: &Enrichment,
        credits: &Credits,
        genres: &HashMap<u32, String>,
        imdb_link: String,
        image_base: &str,
    ) -> Result<Self> {
        let genre_line = item
            .genre_ids
            .iter()
            .filter_map(|id| genres.get(id).map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ");

        let document = IndexDocument {
            id: item.id,
            kind: item.kind,
            title: item.title.clone(),
            release_date: item.release_date.clone(),
            vote_average: item.vote_average,
            vote_count: item.vote_count,
            poster_path: item.poster_path.clone(),
            overview: item.overview.clone(),
            genres: genre_line,
            director: (item.kind == MediaKind::Movie).then(|| credits.director.clone()),
            cast: credits.cast_line(),
            summary: enrichment.summary.clone(),
            keywords: enrichment.keywords.join(", "),
            abstract_text: enrichment.abstract_text.clone(),
        };

        let (movie_id, series_id) = match item.kind {
            MediaKind::Movie => (Some(item.id), None),
            MediaKind::Tv => (None, Some(item.id)),
        };

        let metadata = IndexMetadata {
            movie_id,
            series_id,
            name: item.title.clone(),
            release_year: release_year(&item.release_date),
            vote_average: item.vote_average,
            vote_count: item.vote_count,
            imdb_link,
            poster_link: poster_link(image_base, item.poster_path.as_deref()),
            popularity: item.popularity,
            adult: item.adult,
            extra: Map::new(),
        };

        Ok(Self {
            key: item.key(),
            data: serde_json::to_string(&document)?,
            metadata,
        })
    }
}

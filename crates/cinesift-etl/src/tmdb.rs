//! TMDB catalog source.
//!
//! Lists movies by release year and top-rated TV series page by page, and
//! looks up genres, credits and details (popularity, adult flag, IMDb id)
//! for individual items. Every request waits on a shared [`RateLimiter`]
//! and transient failures are retried under the configured
//! [`RetryPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use cinesift_core::model::{CastMember, CatalogItem, Credits, MediaKind};
use cinesift_core::resilience::{RateLimiter, RetryPolicy};

use crate::error::{EtlError, EtlResult};

const SOURCE_NAME: &str = "TMDB";

/// TMDB never serves pages beyond this, whatever `total_pages` claims.
pub const MAX_PAGES: u32 = 500;

// ---------------------------------------------------------------------------
// API response types (private -- movies and TV name the same fields
// differently)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    results: Vec<RawItem>,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: u64,
    #[serde(default, alias = "name")]
    title: Option<String>,
    #[serde(default, alias = "first_air_date")]
    release_date: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    adult: bool,
}

impl RawItem {
    fn into_item(self, kind: MediaKind) -> CatalogItem {
        CatalogItem {
            kind,
            id: self.id,
            title: self.title.unwrap_or_default(),
            release_date: self.release_date.unwrap_or_default(),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            poster_path: self.poster_path,
            overview: self.overview.unwrap_or_default(),
            genre_ids: self.genre_ids,
            popularity: self.popularity,
            adult: self.adult,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCredits {
    #[serde(default)]
    cast: Vec<RawCast>,
    #[serde(default)]
    crew: Vec<RawCrew>,
}

#[derive(Debug, Deserialize)]
struct RawCast {
    name: String,
    #[serde(default)]
    character: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCrew {
    name: String,
    #[serde(default)]
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    adult: bool,
    #[serde(default)]
    imdb_id: Option<String>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(default)]
    imdb_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One page of a catalog listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    /// Total pages reported by the source, clamped to [`MAX_PAGES`].
    pub total_pages: u32,
}

/// Per-item details used for IMDb links and the metadata backfill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDetails {
    pub popularity: f64,
    pub adult: bool,
    pub imdb_id: Option<String>,
}

/// A paginated movie/TV metadata catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync + fmt::Debug {
    /// Movies released in `year`, most popular first.
    async fn discover_movies(&self, year: i32, page: u32) -> EtlResult<CatalogPage>;

    /// Top-rated TV series.
    async fn top_rated_tv(&self, page: u32) -> EtlResult<CatalogPage>;

    /// Genre id to name lookup for one media kind.
    async fn genres(&self, kind: MediaKind) -> EtlResult<HashMap<u32, String>>;

    /// Top-billed cast and director.
    async fn credits(&self, kind: MediaKind, id: u64) -> EtlResult<Credits>;

    async fn details(&self, kind: MediaKind, id: u64) -> EtlResult<ItemDetails>;
}

/// TMDB v3 API client.
///
/// Wraps an HTTP client, an API key, and a rate limiter. Clones share the
/// limiter, so a pool of workers stays within one request budget.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: Client,
    api_key: String,
    base_url: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl TmdbClient {
    /// Create a new TMDB client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> EtlResult<Self> {
        let http = Client::builder()
            .user_agent("cinesift/0.1.0 (https://github.com/cinesift/cinesift)")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(4),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> EtlResult<T> {
        self.retry
            .run(path, move || async move {
                self.rate_limiter.acquire().await;
                self.get_once(path, query).await
            })
            .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> EtlResult<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(EtlError::RateLimited {
                    source_name: SOURCE_NAME.to_string(),
                })
            }
            StatusCode::NOT_FOUND => {
                return Err(EtlError::NotFound {
                    entity: path.to_string(),
                    source_name: SOURCE_NAME.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(EtlError::Http {
                    source_name: SOURCE_NAME.to_string(),
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                })
            }
            _ => {}
        }

        response.json().await.map_err(|e| EtlError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })
    }

    async fn page(
        &self,
        kind: MediaKind,
        path: &str,
        query: &[(&str, String)],
    ) -> EtlResult<CatalogPage> {
        let raw: RawPage = self.get(path, query).await?;
        Ok(CatalogPage {
            items: raw.results.into_iter().map(|item| item.into_item(kind)).collect(),
            total_pages: raw.total_pages.min(MAX_PAGES),
        })
    }
}

fn language() -> (&'static str, String) {
    ("language", "en-US".to_string())
}

#[async_trait]
impl CatalogSource for TmdbClient {
    async fn discover_movies(&self, year: i32, page: u32) -> EtlResult<CatalogPage> {
        let query = [
            language(),
            ("sort_by", "popularity.desc".to_string()),
            ("year", year.to_string()),
            ("page", page.to_string()),
        ];
        self.page(MediaKind::Movie, "/discover/movie", &query).await
    }

    async fn top_rated_tv(&self, page: u32) -> EtlResult<CatalogPage> {
        let query = [language(), ("page", page.to_string())];
        self.page(MediaKind::Tv, "/tv/top_rated", &query).await
    }

    async fn genres(&self, kind: MediaKind) -> EtlResult<HashMap<u32, String>> {
        let path = format!("/genre/{}/list", kind.as_str());
        let list: GenreList = self.get(&path, &[language()]).await?;
        Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> EtlResult<Credits> {
        let path = format!("/{}/{}/credits", kind.as_str(), id);
        let raw: RawCredits = self.get(&path, &[]).await?;

        let director = raw
            .crew
            .into_iter()
            .find(|member| member.job.as_deref() == Some("Director"))
            .map(|member| member.name);
        let cast = raw
            .cast
            .into_iter()
            .map(|actor| CastMember::new(actor.name, actor.character.unwrap_or_default()))
            .collect();

        Ok(Credits::new(cast, director))
    }

    async fn details(&self, kind: MediaKind, id: u64) -> EtlResult<ItemDetails> {
        let path = format!("/{}/{}", kind.as_str(), id);
        let query = [("append_to_response", "external_ids".to_string())];
        let raw: RawDetails = self.get(&path, &query).await?;

        let imdb_id = raw
            .external_ids
            .and_then(|ids| ids.imdb_id)
            .or(raw.imdb_id)
            .filter(|id| !id.is_empty());

        Ok(ItemDetails {
            popularity: raw.popularity,
            adult: raw.adult,
            imdb_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tv_item_maps_name_and_air_date() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "vote_average": 8.9,
            "vote_count": 13000,
            "poster_path": null,
            "overview": "A chemistry teacher.",
            "genre_ids": [18, 80],
            "popularity": 310.5
        }"#;
        let raw: RawItem = serde_json::from_str(json).unwrap();
        let item = raw.into_item(MediaKind::Tv);

        assert_eq!(item.title, "Breaking Bad");
        assert_eq!(item.release_date, "2008-01-20");
        assert!(item.poster_path.is_none());
        assert!(!item.adult);
        assert_eq!(item.key().to_string(), "tv:1396");
    }

    #[test]
    fn test_raw_movie_item_tolerates_nulls() {
        let json = r#"{"id": 7, "title": "Untitled", "release_date": null, "overview": null}"#;
        let item = serde_json::from_str::<RawItem>(json)
            .unwrap()
            .into_item(MediaKind::Movie);
        assert_eq!(item.release_date, "");
        assert_eq!(item.overview, "");
        assert!(item.genre_ids.is_empty());
    }

    #[test]
    fn test_client_creation() {
        let client = TmdbClient::new("key", "https://api.themoviedb.org/3/").unwrap();
        assert_eq!(client.base_url, "https://api.themoviedb.org/3");
        let debug = format!("{:?}", client);
        assert!(debug.contains("TmdbClient"));
    }
}

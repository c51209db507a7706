use serde::{Deserialize, Serialize};

use super::key::{MediaKind, RecordKey};

/// Placeholder stored when the credits lookup yields no director.
pub const DIRECTOR_UNAVAILABLE: &str = "Director not available";

/// Number of cast members kept per item.
pub const TOP_CAST: usize = 5;

/// A raw catalog entry as listed by the metadata source.
///
/// Movies and TV series share this shape; for TV the `title` holds the
/// series name and `release_date` its first air date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub kind: MediaKind,
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub adult: bool,
}

impl CatalogItem {
    #[must_use]
    pub const fn key(&self) -> RecordKey {
        RecordKey::new(self.kind, self.id)
    }
}

/// A billed cast member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: String,
}

impl CastMember {
    #[must_use]
    pub fn new(name: impl Into<String>, character: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character: character.into(),
        }
    }
}

/// Top-billed cast and director for a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub director: String,
}

impl Credits {
    /// Build credits, keeping only the first [`TOP_CAST`] cast members.
    #[must_use]
    pub fn new(cast: Vec<CastMember>, director: Option<String>) -> Self {
        let mut cast = cast;
        cast.truncate(TOP_CAST);
        Self {
            cast,
            director: director.unwrap_or_else(|| DIRECTOR_UNAVAILABLE.to_string()),
        }
    }

    /// Fallback used when the credits lookup fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Render the cast as `"<name> as <character>"`, comma separated.
    #[must_use]
    pub fn cast_line(&self) -> String {
        self.cast
            .iter()
            .map(|member| format!("{} as {}", member.name, member.character))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Credits {
    fn default() -> Self {
        Self::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credits_truncate_to_top_cast() {
        let cast = (0..8)
            .map(|i| CastMember::new(format!("Actor {i}"), format!("Role {i}")))
            .collect();
        let credits = Credits::new(cast, Some("Jane Doe".to_string()));
        assert_eq!(credits.cast.len(), TOP_CAST);
        assert_eq!(credits.cast[4].name, "Actor 4");
        assert_eq!(credits.director, "Jane Doe");
    }

    #[test]
    fn test_credits_unavailable() {
        let credits = Credits::unavailable();
        assert!(credits.cast.is_empty());
        assert_eq!(credits.director, DIRECTOR_UNAVAILABLE);
    }

    #[test]
    fn test_cast_line() {
        let credits = Credits::new(
            vec![
                CastMember::new("Keanu Reeves", "Neo"),
                CastMember::new("Carrie-Anne Moss", "Trinity"),
            ],
            None,
        );
        assert_eq!(
            credits.cast_line(),
            "Keanu Reeves as Neo, Carrie-Anne Moss as Trinity"
        );
    }

    #[test]
    fn test_catalog_item_key() {
        let item = CatalogItem {
            kind: MediaKind::Movie,
            id: 603,
            title: "The Matrix".to_string(),
            release_date: "1999-03-30".to_string(),
            vote_average: 8.2,
            vote_count: 25_000,
            poster_path: Some("/matrix.jpg".to_string()),
            overview: String::new(),
            genre_ids: vec![28, 878],
            popularity: 80.0,
            adult: false,
        };
        assert_eq!(item.key().to_string(), "movie:603");
    }
}

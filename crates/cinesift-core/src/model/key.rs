use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The two kinds of catalog entries held in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// Prefix used in record keys and in catalog API paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Human-readable noun used in enrichment prompts.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "TV series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(Error::InvalidKey(format!("unknown media kind `{other}`"))),
        }
    }
}

/// Composite index key of the form `"<kind>:<sourceId>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub kind: MediaKind,
    pub source_id: u64,
}

impl RecordKey {
    #[must_use]
    pub const fn new(kind: MediaKind, source_id: u64) -> Self {
        Self { kind, source_id }
    }

    #[must_use]
    pub const fn movie(source_id: u64) -> Self {
        Self::new(MediaKind::Movie, source_id)
    }

    #[must_use]
    pub const fn tv(source_id: u64) -> Self {
        Self::new(MediaKind::Tv, source_id)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.source_id)
    }
}

impl FromStr for RecordKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidKey(format!("missing `:` separator in `{s}`")))?;
        let kind = kind.parse::<MediaKind>()?;
        let source_id = id
            .parse::<u64>()
            .map_err(|_| Error::InvalidKey(format!("non-numeric source id in `{s}`")))?;
        Ok(Self { kind, source_id })
    }
}

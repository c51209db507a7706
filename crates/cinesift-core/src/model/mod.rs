pub mod catalog;
pub mod enrichment;
pub mod key;
pub mod record;

pub use catalog::{CastMember, CatalogItem, Credits, DIRECTOR_UNAVAILABLE};
pub use enrichment::{Enrichment, ABSTRACT_UNAVAILABLE, SUMMARY_UNAVAILABLE};
pub use key::{MediaKind, RecordKey};
pub use record::{
    imdb_link, poster_link, release_year, IndexDocument, IndexMetadata, IndexRecord,
    IMDB_LINK_UNAVAILABLE,
};

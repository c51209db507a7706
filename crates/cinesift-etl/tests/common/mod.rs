//! In-memory fakes shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cinesift_core::model::{CastMember, CatalogItem, Credits, MediaKind};
use cinesift_etl::{CatalogPage, CatalogSource, EtlError, EtlResult, ItemDetails, TextGenerator};
use cinesift_search::{
    Match, Metadata, QueryRequest, RangePage, RangeRequest, StoreError, StoreResult,
    StoredRecord, UpsertRecord, VectorStore,
};
use tokio_util::sync::CancellationToken;

pub fn movie(id: u64, title: &str) -> CatalogItem {
    CatalogItem {
        kind: MediaKind::Movie,
        id,
        title: title.to_string(),
        release_date: "2021-05-01".to_string(),
        vote_average: 7.0,
        vote_count: 1_000,
        poster_path: Some(format!("/{id}.jpg")),
        overview: format!("{title} overview"),
        genre_ids: vec![28],
        popularity: 12.5,
        adult: false,
    }
}

/// Catalog serving fixed pages per listing.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    /// Pages per year for movies; key `0` is the TV listing.
    pub pages: HashMap<i32, Vec<Vec<CatalogItem>>>,
    pub failing_pages: Vec<(i32, u32)>,
    pub details: HashMap<u64, ItemDetails>,
    pub page_requests: Mutex<Vec<(i32, u32)>>,
    pub detail_requests: AtomicUsize,
}

impl FakeCatalog {
    fn page(&self, unit: i32, page: u32) -> EtlResult<CatalogPage> {
        self.page_requests.lock().unwrap().push((unit, page));
        if self.failing_pages.contains(&(unit, page)) {
            return Err(EtlError::Http {
                source_name: "TMDB".to_string(),
                status: 500,
                message: "boom".to_string(),
            });
        }
        let pages = self.pages.get(&unit).cloned().unwrap_or_default();
        let items = pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(CatalogPage {
            items,
            total_pages: pages.len() as u32,
        })
    }

    pub fn requested_pages(&self) -> Vec<(i32, u32)> {
        self.page_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn discover_movies(&self, year: i32, page: u32) -> EtlResult<CatalogPage> {
        self.page(year, page)
    }

    async fn top_rated_tv(&self, page: u32) -> EtlResult<CatalogPage> {
        self.page(0, page)
    }

    async fn genres(&self, _kind: MediaKind) -> EtlResult<HashMap<u32, String>> {
        Ok(HashMap::from([(28, "Action".to_string())]))
    }

    async fn credits(&self, _kind: MediaKind, _id: u64) -> EtlResult<Credits> {
        Ok(Credits::new(
            vec![CastMember::new("Lead", "Hero")],
            Some("Someone".to_string()),
        ))
    }

    async fn details(&self, _kind: MediaKind, id: u64) -> EtlResult<ItemDetails> {
        self.detail_requests.fetch_add(1, Ordering::SeqCst);
        self.details.get(&id).cloned().ok_or_else(|| EtlError::NotFound {
            entity: id.to_string(),
            source_name: "TMDB".to_string(),
        })
    }
}

/// Text generator returning a fixed reply and counting calls.
#[derive(Debug)]
pub struct FakeGenerator {
    pub reply: String,
    pub calls: AtomicUsize,
    /// Cancelled on the first call, to interrupt a run mid-page.
    pub cancel: Option<CancellationToken>,
}

impl FakeGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            cancel: None,
        }
    }

    pub fn cancelling(cancel: &CancellationToken) -> Self {
        Self {
            cancel: Some(cancel.clone()),
            ..Self::valid()
        }
    }

    pub fn valid() -> Self {
        Self::new(r#"{"summary": "A story.", "keywords": ["a", "b"], "abstract": "One line."}"#)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str) -> EtlResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        Ok(self.reply.clone())
    }
}

/// Vector store backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Mutex<BTreeMap<String, (String, Metadata)>>,
    pub upserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_fetch: bool,
    pub fail_upsert: bool,
    /// Records returned by every filtered query, regardless of the filter.
    pub sentinel_hits: Vec<String>,
}

impl MemoryStore {
    pub fn insert(&self, id: &str, metadata: Metadata) {
        self.records
            .lock()
            .unwrap()
            .insert(id.to_string(), (String::new(), metadata));
    }

    pub fn metadata(&self, id: &str) -> Option<Metadata> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|(_, metadata)| metadata.clone())
    }

    pub fn data(&self, id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|(data, _)| data.clone())
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, record: UpsertRecord) -> StoreResult<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert {
            return Err(StoreError::Http {
                status: 400,
                message: "rejected".to_string(),
            });
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.id, (record.data, record.metadata));
        Ok(())
    }

    async fn fetch(&self, ids: &[String]) -> StoreResult<Vec<Option<StoredRecord>>> {
        if self.fail_fetch {
            return Err(StoreError::Http {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        let records = self.records.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| {
                records.get(id).map(|(data, metadata)| StoredRecord {
                    id: id.clone(),
                    vector: None,
                    metadata: Some(metadata.clone()),
                    data: Some(data.clone()),
                })
            })
            .collect())
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<Vec<Match>> {
        let records = self.records.lock().unwrap();
        let ids: Vec<String> = if request.filter.is_some() {
            self.sentinel_hits.clone()
        } else {
            records.keys().cloned().collect()
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                records.get(&id).map(|(_, metadata)| Match {
                    id: id.clone(),
                    score: 0.5,
                    vector: None,
                    metadata: Some(metadata.clone()),
                })
            })
            .take(request.top_k)
            .collect())
    }

    async fn update(&self, id: &str, metadata: Metadata) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            Some(entry) => {
                entry.1 = metadata;
                Ok(())
            }
            None => Err(StoreError::Api(format!("no record with id {id}"))),
        }
    }

    async fn range(&self, request: RangeRequest) -> StoreResult<RangePage> {
        let records = self.records.lock().unwrap();
        let start: usize = request.cursor.parse().unwrap_or(0);
        let vectors: Vec<StoredRecord> = records
            .iter()
            .skip(start)
            .take(request.limit)
            .map(|(id, (_, metadata))| StoredRecord {
                id: id.clone(),
                vector: None,
                metadata: Some(metadata.clone()),
                data: None,
            })
            .collect();
        let next = start + vectors.len();
        Ok(RangePage {
            next_cursor: (next < records.len()).then(|| next.to_string()),
            vectors,
        })
    }
}

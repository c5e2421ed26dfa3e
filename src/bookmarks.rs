use crate::{
    keywords::{Extraction, MAX_KEYWORDS},
    search,
    storage::StorageManager,
};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::Display,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Not Indexed")]
    NotIndexed,
    #[serde(rename = "Indexing...")]
    Indexing,
    Success,
    Failed,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Status::NotIndexed => "Not Indexed",
            Status::Indexing => "Indexing...",
            Status::Success => "Success",
            Status::Failed => "Failed",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BookmarkRecord {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            keywords: vec![],
            status: Status::NotIndexed,
            error_message: None,
        }
    }

    pub fn begin_indexing(&mut self) {
        self.status = Status::Indexing;
        self.error_message = None;
    }

    /// Moves the record out of `Indexing` according to the extraction outcome.
    pub fn finish(&mut self, extraction: Extraction) {
        match extraction {
            Extraction::Keywords(keywords) => {
                self.status = Status::Success;
                self.keywords = keywords;
                self.error_message = None;
            }
            Extraction::FileType(tag) => {
                self.status = Status::Success;
                self.keywords = vec![tag];
                self.error_message = None;
            }
            Extraction::Failed(message) => {
                self.status = Status::Failed;
                self.keywords = vec![];
                self.error_message = Some(message);
            }
        }
    }

    /// True when no extraction has completed for this record yet.
    pub fn needs_indexing(&self) -> bool {
        matches!(self.status, Status::NotIndexed | Status::Indexing)
    }

    pub fn status_text(&self) -> String {
        match (&self.status, &self.error_message) {
            (Status::Failed, Some(message)) if !message.is_empty() => format!("Failed: {message}"),
            (status, _) => status.to_string(),
        }
    }

    fn normalize(&mut self) {
        self.keywords.truncate(MAX_KEYWORDS);
        if self.status != Status::Failed {
            self.error_message = None;
        }
    }
}

/// Only http and https bookmarks are ever indexed.
pub fn is_indexable_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Trim, drop empties and cap a user supplied keyword list.
pub fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|kw| kw.trim().to_string())
        .filter(|kw| !kw.is_empty())
        .take(MAX_KEYWORDS)
        .collect()
}

pub type IndexMap = BTreeMap<String, BookmarkRecord>;

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIndex {
    Map(IndexMap),
    List(Vec<BookmarkRecord>),
}

/// Persisted url -> record mapping.
///
/// Every mutation holds the write lock until the whole map has been written
/// back, so two mutations can never interleave their read-modify-write.
/// Readers see the last committed state.
pub struct IndexStore {
    records: RwLock<IndexMap>,
    storage: Arc<dyn StorageManager>,
}

impl IndexStore {
    pub fn load(storage: Arc<dyn StorageManager>) -> anyhow::Result<Self> {
        let now = Instant::now();

        let records = if storage.exists(INDEX_FILE) {
            let data = storage.read(INDEX_FILE)?;
            let stored: StoredIndex = serde_json::from_slice(&data)?;
            normalize(stored)
        } else {
            log::info!("no index found, starting with an empty one");
            IndexMap::new()
        };

        log::debug!(
            "took {}ms to load {} records",
            now.elapsed().as_micros() as f64 / 1000.0,
            records.len()
        );

        Ok(Self {
            records: RwLock::new(records),
            storage,
        })
    }

    /// Run `f` against a copy of the map under the write lock and persist it.
    /// The copy only replaces the live map once it is on disk.
    pub fn mutate<F, R>(&self, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut IndexMap) -> R,
    {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("index lock poisoned: {e}"))?;

        let mut next = records.clone();
        let result = f(&mut next);

        let data = serde_json::to_vec_pretty(&next)?;
        self.storage.write(INDEX_FILE, &data)?;
        *records = next;

        Ok(result)
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&IndexMap) -> R,
    {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        f(&records)
    }

    pub fn get_all(&self) -> IndexMap {
        self.read(|records| records.clone())
    }

    pub fn get(&self, url: &str) -> Option<BookmarkRecord> {
        self.read(|records| records.get(url).cloned())
    }

    pub fn len(&self) -> usize {
        self.read(|records| records.len())
    }

    pub fn upsert(&self, record: BookmarkRecord) -> anyhow::Result<()> {
        self.mutate(|records| {
            records.insert(record.url.clone(), record);
        })
    }

    pub fn remove_many(&self, urls: &[String]) -> anyhow::Result<usize> {
        self.mutate(|records| {
            urls.iter()
                .filter(|url| records.remove(url.as_str()).is_some())
                .count()
        })
    }

    /// Returns false when no record exists for `url`.
    pub fn set_keywords(&self, url: &str, keywords: Vec<String>) -> anyhow::Result<bool> {
        let keywords = clean_keywords(keywords);
        self.mutate(|records| match records.get_mut(url) {
            Some(record) => {
                record.keywords = keywords;
                true
            }
            None => false,
        })
    }

    pub fn replace_all(&self, new_records: IndexMap) -> anyhow::Result<()> {
        self.mutate(|records| *records = new_records)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<BookmarkRecord> {
        self.read(|records| {
            search::search(query, records.values(), limit)
                .into_iter()
                .cloned()
                .collect()
        })
    }
}

fn normalize(stored: StoredIndex) -> IndexMap {
    let list = match stored {
        StoredIndex::Map(map) => map.into_values().collect::<Vec<_>>(),
        StoredIndex::List(list) => list,
    };

    let mut records = IndexMap::new();
    for mut record in list {
        if !is_indexable_url(&record.url) {
            log::warn!("dropping record with unsupported url {:?}", record.url);
            continue;
        }
        record.normalize();
        records.insert(record.url.clone(), record);
    }

    records
}

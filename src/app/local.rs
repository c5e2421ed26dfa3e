use std::{collections::BTreeMap, sync::Arc};

use crate::{
    bookmarks::{is_indexable_url, BookmarkRecord, IndexMap, IndexStore, Status},
    config::Config,
    keywords::{Extraction, KeywordExtractor},
    scrape::{PageFetcher, ReqwestFetcher},
    storage::{BackendLocal, StorageManager},
    suggest::{self, Suggestion},
    sync::{self, SyncReport, SyncState, Synchronizer},
    tree::{flatten, BookmarkEvent, LiveBookmark},
};

use super::{
    errors::AppError,
    messages::{EventOutcome, IndexReport, Message, Reply},
};

/// Owns the index and everything that reads or writes it.
pub struct App {
    store: IndexStore,
    state: SyncState,
    extractor: KeywordExtractor,
    config: Config,
}

impl App {
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let storage = Arc::new(BackendLocal::new(config.base_path())?);
        let fetcher = Arc::new(ReqwestFetcher::new(&config)?);

        Self::new_with(config, storage, fetcher)
    }

    pub fn new_with(
        config: Config,
        storage: Arc<dyn StorageManager>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> anyhow::Result<Self> {
        let store = IndexStore::load(storage.clone())?;
        let state = SyncState::load(storage)?;

        log::debug!(
            "loaded {} records, initialized: {}",
            store.len(),
            state.is_initialized()
        );

        Ok(Self {
            store,
            state,
            extractor: KeywordExtractor::new(fetcher),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Number of pages a full sync against `live` would fetch.
    pub fn pending_fetches(&self, live: &[LiveBookmark]) -> usize {
        self.store
            .read(|index| sync::plan(live.to_vec(), index).fetch_count())
    }

    pub fn full_sync(
        &self,
        live: Vec<LiveBookmark>,
        progress: &(dyn Fn(&str) + Sync),
    ) -> anyhow::Result<SyncReport> {
        let synchronizer =
            Synchronizer::new(&self.extractor, self.config.sync_parallelism as usize);
        let report = synchronizer.full_sync(live, &self.store, progress)?;

        self.state.mark_initialized()?;

        Ok(report)
    }

    pub fn handle_event(&self, event: BookmarkEvent) -> Result<EventOutcome, AppError> {
        if !self.state.is_initialized() {
            log::debug!("ignoring {event:?}: no full sync yet");
            return Ok(EventOutcome::Ignored);
        }

        match event {
            BookmarkEvent::Created { node } => {
                let mut urls = vec![];
                for bookmark in flatten(&[node]) {
                    if self.index_live(&bookmark)?.is_some() {
                        urls.push(bookmark.url);
                    }
                }
                Ok(EventOutcome::Indexed { urls })
            }
            BookmarkEvent::Changed { url, title } => {
                let bookmark = LiveBookmark { title, url };
                let urls = self
                    .index_live(&bookmark)?
                    .map(|record| vec![record.url])
                    .unwrap_or_default();
                Ok(EventOutcome::Indexed { urls })
            }
            BookmarkEvent::Removed { node } => {
                let urls = flatten(&[node])
                    .into_iter()
                    .map(|bookmark| bookmark.url)
                    .collect::<Vec<_>>();
                let count = self.store.remove_many(&urls)?;
                Ok(EventOutcome::Removed { count })
            }
        }
    }

    /// Re-extracts a live bookmark, keeping its existing record if any.
    /// Unsupported urls are skipped without a record.
    fn index_live(&self, bookmark: &LiveBookmark) -> anyhow::Result<Option<BookmarkRecord>> {
        if !is_indexable_url(&bookmark.url) {
            log::debug!("skipping unsupported url {:?}", bookmark.url);
            return Ok(None);
        }

        let record = self.store.mutate(|index| {
            let record = index
                .entry(bookmark.url.clone())
                .or_insert_with(|| BookmarkRecord::new(&bookmark.url, &bookmark.title));
            record.title = bookmark.title.clone();
            record.begin_indexing();
            record.clone()
        })?;

        self.finish_indexing(record)
    }

    /// Marks an existing record `Indexing...` and re-extracts it.
    /// Returns None when there is no record for `url`.
    fn reindex(&self, url: &str) -> anyhow::Result<Option<BookmarkRecord>> {
        let record = self.store.mutate(|index| {
            index.get_mut(url).map(|record| {
                record.begin_indexing();
                record.clone()
            })
        })?;

        match record {
            Some(record) => self.finish_indexing(record),
            None => Ok(None),
        }
    }

    /// Fetches and persists the final status. Returns None when the record
    /// was deleted while its page was fetched.
    fn finish_indexing(&self, mut record: BookmarkRecord) -> anyhow::Result<Option<BookmarkRecord>> {
        record.finish(self.extractor.extract(&record.url));

        self.store.mutate(move |index| match index.get_mut(&record.url) {
            Some(stored) => {
                *stored = record.clone();
                Some(record)
            }
            None => {
                log::debug!("{} was removed while indexing", record.url);
                None
            }
        })
    }

    pub fn index_bookmarks(&self, urls: &[String]) -> Result<IndexReport, AppError> {
        let mut report = IndexReport::default();

        for url in urls {
            match self.reindex(url)? {
                Some(record) if record.status == Status::Failed => report.failed += 1,
                Some(_) => report.indexed += 1,
                None => {
                    log::warn!("bookmark not found in index: {url}");
                    report.missing += 1;
                }
            }
        }

        log::info!("{report:?}");
        Ok(report)
    }

    pub fn delete_bookmarks(&self, urls: &[String]) -> Result<usize, AppError> {
        Ok(self.store.remove_many(urls)?)
    }

    pub fn update_keywords(&self, url: &str, keywords: Vec<String>) -> Result<(), AppError> {
        if self.store.set_keywords(url, keywords)? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Replaces the whole index with unindexed records for `live`.
    pub fn import(&self, live: Vec<LiveBookmark>) -> Result<usize, AppError> {
        let records = live
            .into_iter()
            .filter(|bookmark| is_indexable_url(&bookmark.url))
            .map(|bookmark| {
                let record = BookmarkRecord::new(&bookmark.url, &bookmark.title);
                (bookmark.url, record)
            })
            .collect::<BTreeMap<_, _>>();

        let count = records.len();
        self.store.replace_all(records)?;
        log::info!("{count} bookmarks imported");

        Ok(count)
    }

    /// At most `search_limit` results unless `limit` says otherwise.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<BookmarkRecord> {
        self.store
            .search(query, limit.unwrap_or(self.config.search_limit))
    }

    /// Blank input yields no suggestions.
    pub fn suggest(&self, text: &str) -> Vec<Suggestion> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        suggest::format_suggestions(&self.store.search(text, self.config.search_limit))
    }

    pub fn records(&self) -> IndexMap {
        self.store.get_all()
    }

    pub fn record(&self, url: &str) -> Option<BookmarkRecord> {
        self.store.get(url)
    }

    pub fn extract(&self, url: &str) -> Result<Extraction, AppError> {
        if !is_indexable_url(url) {
            return Err(AppError::InvalidUrl(url.to_string()));
        }

        Ok(self.extractor.extract(url))
    }

    /// Dispatches a UI message. Failures are reported in the reply.
    pub fn handle(&self, message: Message) -> Reply {
        let result = match message {
            Message::IndexBookmarks { bookmarks } => {
                let urls = bookmarks.into_iter().map(|b| b.url).collect::<Vec<_>>();
                self.index_bookmarks(&urls).map(|report| Reply {
                    indexed: Some(report.indexed),
                    failed: Some(report.failed),
                    ..Reply::ok()
                })
            }
            Message::DeleteBookmarks { urls } => {
                self.delete_bookmarks(&urls).map(|count| Reply {
                    deleted_count: Some(count),
                    ..Reply::ok()
                })
            }
            Message::UpdateKeywords { url, keywords } => {
                self.update_keywords(&url, keywords).map(|_| Reply::ok())
            }
        };

        result.unwrap_or_else(|err| {
            log::warn!("message failed: {err}");
            Reply::err(err)
        })
    }
}

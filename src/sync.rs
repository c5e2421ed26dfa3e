//! Reconciles the live bookmark tree with the persisted index.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    bookmarks::{is_indexable_url, BookmarkRecord, IndexMap, IndexStore},
    keywords::KeywordExtractor,
    storage::StorageManager,
    tree::LiveBookmark,
};

const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Live bookmarks skipped for not being http(s).
    pub invalid: usize,
    /// Added or updated records whose extraction failed.
    pub failed: usize,
}

/// What a full sync has to do, computed without touching the network.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub to_remove: Vec<String>,
    pub to_add: Vec<LiveBookmark>,
    pub to_update: Vec<LiveBookmark>,
    pub unchanged: usize,
    pub invalid: usize,
}

impl SyncPlan {
    pub fn fetch_count(&self) -> usize {
        self.to_add.len() + self.to_update.len()
    }
}

pub fn plan(live: Vec<LiveBookmark>, index: &IndexMap) -> SyncPlan {
    let mut plan = SyncPlan::default();

    // duplicates collapse, last one wins
    let mut live_by_url: BTreeMap<String, LiveBookmark> = BTreeMap::new();
    for bookmark in live {
        if !is_indexable_url(&bookmark.url) {
            log::debug!("skipping unsupported url {:?}", bookmark.url);
            plan.invalid += 1;
            continue;
        }
        live_by_url.insert(bookmark.url.clone(), bookmark);
    }

    plan.to_remove = index
        .keys()
        .filter(|url| !live_by_url.contains_key(*url))
        .cloned()
        .collect();

    for (url, bookmark) in live_by_url {
        match index.get(&url) {
            None => plan.to_add.push(bookmark),
            Some(record) if record.title != bookmark.title || record.needs_indexing() => {
                plan.to_update.push(bookmark)
            }
            Some(_) => plan.unchanged += 1,
        }
    }

    plan
}

pub struct Synchronizer<'a> {
    extractor: &'a KeywordExtractor,
    parallelism: usize,
}

impl<'a> Synchronizer<'a> {
    pub fn new(extractor: &'a KeywordExtractor, parallelism: usize) -> Self {
        Self {
            extractor,
            parallelism: parallelism.max(1),
        }
    }

    pub fn full_sync(
        &self,
        live: Vec<LiveBookmark>,
        store: &IndexStore,
        progress: &(dyn Fn(&str) + Sync),
    ) -> anyhow::Result<SyncReport> {
        let plan = store.read(|index| plan(live, index));

        log::info!(
            "sync plan: {} to add, {} to update, {} to remove, {} unchanged",
            plan.to_add.len(),
            plan.to_update.len(),
            plan.to_remove.len(),
            plan.unchanged
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()?;

        let index_one = |bookmark: &LiveBookmark| {
            let mut record = BookmarkRecord::new(&bookmark.url, &bookmark.title);
            record.begin_indexing();
            record.finish(self.extractor.extract(&bookmark.url));
            progress(&bookmark.url);
            record
        };

        let (added, updated): (Vec<BookmarkRecord>, Vec<BookmarkRecord>) = pool.install(|| {
            (
                plan.to_add.par_iter().map(&index_one).collect(),
                plan.to_update.par_iter().map(&index_one).collect(),
            )
        });

        let report = SyncReport {
            added: added.len(),
            updated: updated.len(),
            removed: plan.to_remove.len(),
            unchanged: plan.unchanged,
            invalid: plan.invalid,
            failed: added
                .iter()
                .chain(updated.iter())
                .filter(|record| record.error_message.is_some())
                .count(),
        };

        let to_remove = plan.to_remove.into_iter().collect::<HashSet<_>>();
        store.mutate(move |index| {
            index.retain(|url, _| !to_remove.contains(url));
            for record in added.into_iter().chain(updated) {
                index.insert(record.url.clone(), record);
            }
        })?;

        log::info!("{report:?}");

        Ok(report)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    is_initialized: bool,
}

/// Whether the first full sync has completed. Incremental bookmark events are
/// only applied once it has.
pub struct SyncState {
    initialized: AtomicBool,
    storage: Arc<dyn StorageManager>,
}

impl SyncState {
    pub fn load(storage: Arc<dyn StorageManager>) -> anyhow::Result<Self> {
        let stored = if storage.exists(STATE_FILE) {
            serde_json::from_slice::<StoredState>(&storage.read(STATE_FILE)?)?
        } else {
            StoredState::default()
        };

        Ok(Self {
            initialized: AtomicBool::new(stored.is_initialized),
            storage,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn mark_initialized(&self) -> anyhow::Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let data = serde_json::to_vec(&StoredState {
            is_initialized: true,
        })?;
        self.storage.write(STATE_FILE, &data)?;
        Ok(())
    }
}

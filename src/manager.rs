//! Sync orchestration and the query path.
//!
//! `SearchIndexManager` decides between full and incremental sync, performs
//! it, and answers queries against the single live in-memory index. Sync
//! takes `&mut self` and queries take `&self`, so a merge in progress can
//! never interleave with a query; no lock is needed around the live index.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::common::Timer;
use crate::fetch::CorpusFetcher;
use crate::index::SearchIndex;
use crate::store::{IndexStore, SyncState};

/// One query result, projected down to the fields the caller renders.
/// The document body is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub url: String,
}

/// Orchestrates fetch-or-load-from-cache, incremental update, and query
/// evaluation.
pub struct SearchIndexManager<F: CorpusFetcher> {
    fetcher: F,
    store: IndexStore,
    index: SearchIndex,
}

impl<F: CorpusFetcher> SearchIndexManager<F> {
    /// The live index starts empty; queries issued before [`sync`] completes
    /// run against it and simply yield no matches.
    ///
    /// [`sync`]: SearchIndexManager::sync
    pub fn new(fetcher: F, store: IndexStore) -> Self {
        Self {
            fetcher,
            store,
            index: SearchIndex::new(),
        }
    }

    /// Bring the live index up to date with the remote corpus.
    ///
    /// Fire-and-forget: never fails. A full sync runs when there is no
    /// usable cached index or the advertised schema version changed;
    /// otherwise only documents updated after the persisted watermark are
    /// fetched and merged. Any fetch error leaves the previously loaded
    /// (possibly stale, possibly empty) index as the live index.
    ///
    /// Idempotent: a repeat call after a successful sync performs an
    /// incremental fetch that returns nothing and changes nothing.
    pub async fn sync(&mut self) {
        let timer = Timer::start("corpus sync");
        let current_version = self.fetcher.schema_version().to_string();
        let state = self.store.load_sync_state();
        let cached = self.store.load_index();
        let have_cached_index = cached.is_some();
        if let Some(index) = cached {
            // Serve stale results if the refresh below fails.
            self.index = index;
        }

        let outcome = match state {
            Some(state) if have_cached_index && state.schema_version == current_version => {
                self.incremental_sync(&state).await
            }
            state => {
                if let Some(state) = &state {
                    if state.schema_version != current_version {
                        info!(
                            cached = %state.schema_version,
                            current = %current_version,
                            "Schema version changed, discarding persisted index"
                        );
                        self.store.clear();
                    }
                }
                self.full_sync(&current_version).await
            }
        };

        if let Err(e) = outcome {
            warn!("Corpus sync failed, keeping previously loaded index: {e}");
        }
        timer.finish();
    }

    /// Full-text query against the live index.
    ///
    /// Synchronous and read-only: no network or storage access, safe to call
    /// on every keystroke. Empty or whitespace-only input returns no results
    /// without touching the index. Relevance ordering comes straight from
    /// the index; no re-sorting happens here.
    pub fn query(&self, term: &str) -> Vec<SearchHit> {
        if term.trim().is_empty() {
            return Vec::new();
        }
        self.index
            .search(term)
            .into_iter()
            .filter_map(|(document_id, _score)| {
                self.index.meta(&document_id).map(|meta| SearchHit {
                    title: meta.title.clone(),
                    url: meta.url.clone(),
                    document_id,
                })
            })
            .collect()
    }

    /// The underlying store (mainly useful for inspecting persisted state).
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    async fn full_sync(&mut self, schema_version: &str) -> Result<(), String> {
        let documents = self.fetcher.fetch_all().await?;
        let Some(newest) = documents.first() else {
            // Nothing to anchor the watermark to; leave the index empty and
            // retry a full sync on the next startup.
            debug!("Corpus is empty, skipping index build");
            self.index = SearchIndex::new();
            return Ok(());
        };
        let watermark = newest.updated_at.clone();

        let mut index = SearchIndex::new();
        for doc in &documents {
            index.add(doc);
        }
        self.index = index;
        self.store.save_index(&self.index);
        self.store.save_sync_state(&SyncState {
            schema_version: schema_version.to_string(),
            last_synced_at: watermark,
        });
        info!(
            documents = documents.len(),
            "Rebuilt search index from full corpus"
        );
        Ok(())
    }

    async fn incremental_sync(&mut self, state: &SyncState) -> Result<(), String> {
        // Strictly-after watermark semantics: the anchor document is never
        // re-fetched, so a second document sharing its exact timestamp but
        // written after the watermark was captured can be missed. Accepted
        // trade-off; greater-or-equal would re-fetch the anchor forever.
        let documents = self.fetcher.fetch_since(&state.last_synced_at).await?;
        let Some(newest) = documents.first() else {
            debug!("Search index is up to date");
            return Ok(());
        };
        let watermark = newest.updated_at.clone();

        for doc in &documents {
            self.index.add(doc);
        }
        self.store.save_index(&self.index);
        self.store.save_sync_state(&SyncState {
            schema_version: state.schema_version.clone(),
            last_synced_at: watermark,
        });
        info!(
            documents = documents.len(),
            total = self.index.len(),
            "Merged updated documents into search index"
        );
        Ok(())
    }
}

impl<F: CorpusFetcher> fmt::Debug for SearchIndexManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndexManager")
            .field("indexed_documents", &self.index.len())
            .finish_non_exhaustive()
    }
}

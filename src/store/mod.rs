//! Durable storage for the serialized index and sync watermark.
//!
//! `IndexStore` owns the two persisted entries behind a [`KeyValueStorage`]
//! backend. Reads treat anything malformed as a cache miss and writes are
//! best-effort: the index stays usable in memory even when persistence
//! fails, so no storage error ever reaches the sync or query path.

pub mod kv;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::index::SearchIndex;
use self::kv::KeyValueStorage;

/// Storage key suffix for the serialized index.
const INDEX_KEY: &str = "index";
/// Storage key suffix for the sync state.
const SYNC_STATE_KEY: &str = "sync-state";

/// Persisted sync watermark.
///
/// `last_synced_at` is the `updated_at` of the most recent document already
/// incorporated into the persisted index, not the wall-clock time of the
/// sync. `schema_version` is the externally supplied migration tag that was
/// current when the state was written; a mismatch at startup means the
/// cached index describes an incompatible corpus shape and is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub schema_version: String,
    pub last_synced_at: String,
}

/// Durable get/set of the serialized index and sync state.
///
/// The namespace prefix is passed in explicitly so multiple indices can
/// coexist in one storage backend.
pub struct IndexStore {
    storage: Box<dyn KeyValueStorage>,
    namespace: String,
}

impl IndexStore {
    pub fn new(storage: Box<dyn KeyValueStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    /// Load the persisted index. Absent or unreadable data is a cache miss.
    pub fn load_index(&self) -> Option<SearchIndex> {
        let raw = self.storage.get(&self.key(INDEX_KEY))?;
        match SearchIndex::from_json(&raw) {
            Ok(index) => {
                debug!(documents = index.len(), "Loaded cached search index");
                Some(index)
            }
            Err(e) => {
                warn!("Cached search index is unreadable, treating as cache miss: {e}");
                None
            }
        }
    }

    /// Persist the index, overwriting any prior value. Best-effort.
    pub fn save_index(&mut self, index: &SearchIndex) {
        match index.to_json() {
            Ok(raw) => self.storage.set(&self.key(INDEX_KEY), &raw),
            Err(e) => warn!("Failed to serialize search index, keeping it in memory only: {e}"),
        }
    }

    /// Load the persisted sync state. Absent or unreadable data is a miss.
    pub fn load_sync_state(&self) -> Option<SyncState> {
        let raw = self.storage.get(&self.key(SYNC_STATE_KEY))?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Cached sync state is unreadable, treating as cache miss: {e}");
                None
            }
        }
    }

    /// Persist the sync state. Best-effort.
    pub fn save_sync_state(&mut self, state: &SyncState) {
        match serde_json::to_string(state) {
            Ok(raw) => self.storage.set(&self.key(SYNC_STATE_KEY), &raw),
            Err(e) => warn!("Failed to serialize sync state: {e}"),
        }
    }

    /// Remove both persisted entries.
    pub fn clear(&mut self) {
        self.storage.remove(&self.key(INDEX_KEY));
        self.storage.remove(&self.key(SYNC_STATE_KEY));
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.namespace)
    }
}

impl fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::document::Document;
    use super::kv::MemoryStorage;

    fn doc(id: &str, title: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            body: String::new(),
            url: String::new(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            visibility: String::new(),
        }
    }

    #[test]
    fn test_index_round_trip() {
        let mut store = IndexStore::new(Box::new(MemoryStorage::new()), "blog");
        assert!(store.load_index().is_none());

        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello World"));
        store.save_index(&index);

        let loaded = store.load_index().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.search("hello")[0].0, "1");
    }

    #[test]
    fn test_sync_state_round_trip() {
        let mut store = IndexStore::new(Box::new(MemoryStorage::new()), "blog");
        assert!(store.load_sync_state().is_none());

        let state = SyncState {
            schema_version: "v1".to_string(),
            last_synced_at: "2024-01-02".to_string(),
        };
        store.save_sync_state(&state);
        assert_eq!(store.load_sync_state().unwrap(), state);
    }

    #[test]
    fn test_malformed_entries_read_as_cache_miss() {
        let mut storage = MemoryStorage::new();
        storage.set("blog.index", "{ definitely not an index");
        storage.set("blog.sync-state", "[]");

        let store = IndexStore::new(Box::new(storage), "blog");
        assert!(store.load_index().is_none());
        assert!(store.load_sync_state().is_none());
    }

    #[test]
    fn test_clear_removes_both_entries() {
        let storage = MemoryStorage::new();
        let mut store = IndexStore::new(Box::new(storage.clone()), "blog");

        store.save_index(&SearchIndex::new());
        store.save_sync_state(&SyncState {
            schema_version: "v1".to_string(),
            last_synced_at: "2024-01-02".to_string(),
        });
        store.clear();

        assert!(storage.get("blog.index").is_none());
        assert!(storage.get("blog.sync-state").is_none());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let storage = MemoryStorage::new();
        let mut store_a = IndexStore::new(Box::new(storage.clone()), "tenant-a");
        let store_b = IndexStore::new(Box::new(storage), "tenant-b");

        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello"));
        store_a.save_index(&index);

        assert!(store_a.load_index().is_some());
        assert!(store_b.load_index().is_none());
    }
}

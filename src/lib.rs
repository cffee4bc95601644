#![forbid(unsafe_code)]
#![deny(warnings, unused_must_use, dead_code, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Client-side incremental full-text search.
//!
//! The crate keeps a serializable inverted index over a remote corpus of
//! documents, persists it through a key-value storage backend so it survives
//! restarts, and refreshes it incrementally: only documents updated since
//! the persisted watermark are re-fetched. An externally supplied schema
//! ("migration") version invalidates the cache when the corpus shape
//! changes. Queries run synchronously against the live in-memory index, so
//! they are safe to issue on every keystroke.
//!
//! # Usage
//!
//! ```no_run
//! use driftsearch::{FileStorage, HttpCorpusFetcher, IndexStore, SearchIndexManager};
//!
//! # async fn example() -> Result<(), String> {
//! let fetcher = HttpCorpusFetcher::new("https://blog.example.com/api", "v1");
//! let store = IndexStore::new(Box::new(FileStorage::open_default()?), "blog");
//! let mut manager = SearchIndexManager::new(fetcher, store);
//!
//! manager.sync().await; // once at startup; failures degrade to stale results
//! for hit in manager.query("hello") {
//!     println!("{} -> {}", hit.title, hit.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Rendering of results, as well as the storage backend and the remote
//! endpoint, stay outside the crate: callers plug in a [`KeyValueStorage`]
//! and a [`CorpusFetcher`] and consume plain [`SearchHit`] values.

mod common;
pub mod document;
pub mod fetch;
pub mod index;
pub mod manager;
pub mod store;

pub use document::Document;
pub use fetch::{CorpusFetcher, HttpCorpusFetcher};
pub use index::SearchIndex;
pub use manager::{SearchHit, SearchIndexManager};
pub use store::kv::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{IndexStore, SyncState};

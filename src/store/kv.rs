//! Key-value storage backends.
//!
//! Persistence is best-effort throughout: a backend may silently fail to
//! persist (quota, permissions) without surfacing an error to the caller,
//! and a failed read is indistinguishable from an absent entry.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Minimal persistent key-value storage abstraction.
pub trait KeyValueStorage: Send {
    /// Read a value, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value, best-effort.
    fn set(&mut self, key: &str, value: &str);
    /// Remove a value, best-effort.
    fn remove(&mut self, key: &str);
}

/// In-memory storage behind a shared handle.
///
/// Clones share the same map, so two components (or a test and the code
/// under test) can observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&mut self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// File-per-key storage under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) storage rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, String> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| format!("Failed to create storage directory {}: {e}", root.display()))?;
        Ok(Self { root })
    }

    /// Open storage at the default location (`~/.driftsearch`).
    pub fn open_default() -> Result<Self, String> {
        let home = dirs::home_dir().ok_or("Could not determine home directory")?;
        Self::open(home.join(".driftsearch"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are opaque strings; map them onto safe filenames.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        let path = self.path_for(key);
        // Write to a temporary file first, then rename atomically.
        let temp_path = path.with_extension("tmp");
        if let Err(e) = fs::write(&temp_path, value) {
            warn!("Failed to write storage entry {key}: {e}");
            return;
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            warn!("Failed to commit storage entry {key}: {e}");
        }
    }

    fn remove(&mut self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove storage entry {key}: {e}");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v");
        assert_eq!(storage.get("k"), Some("v".to_string()));
        storage.remove("k");
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let mut storage = MemoryStorage::new();
        let reader = storage.clone();
        storage.set("k", "v");
        assert_eq!(reader.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        storage.set("blog.index", "{}");
        assert_eq!(storage.get("blog.index"), Some("{}".to_string()));
        storage.remove("blog.index");
        assert_eq!(storage.get("blog.index"), None);
        // Removing an absent key is a no-op.
        storage.remove("blog.index");
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        storage.set("ns/with:odd chars", "v");
        assert_eq!(storage.get("ns/with:odd chars"), Some("v".to_string()));
        // No stray subdirectories were created.
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_file());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut storage = FileStorage::open(dir.path()).unwrap();
            storage.set("k", "persisted");
        }
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get("k"), Some("persisted".to_string()));
    }
}

//! JSON-file preference backend.
//!
//! The whole map is kept in memory and rewritten on every mutation. Writes go
//! to a sibling temporary file that is then renamed over the original, so a
//! crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::{PreferenceStore, StoreError};

/// A preference store persisted as a flat JSON object of strings.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is treated as an empty store; the file is created on
    /// the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| StoreError::Corruption(format!("{}: {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened preference file");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_many(&[key])
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if !keys.iter().any(|key| entries.contains_key(*key)) {
            return Ok(());
        }
        let mut next = entries.clone();
        for key in keys {
            next.remove(*key);
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("prefs.json")).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("language", "ja").unwrap();
            store.set("theme", "dark").unwrap();
            store.remove("theme").unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("language").unwrap().as_deref(), Some("ja"));
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn remove_many_deletes_listed_keys_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("prefs.json")).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();
        store.remove_many(&["a", "c", "missing"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("c").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonFileStore::open(blocker.join("prefs.json")).unwrap();

        assert!(store.set("language", "ja").is_err());
        assert_eq!(store.get("language").unwrap(), None);
    }

    #[test]
    fn failed_remove_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"a":"1","b":"2"}"#).unwrap();
        let store = JsonFileStore::open(&path).unwrap();

        // The temporary file cannot be written while a directory sits in its place.
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(store.remove_many(&["a"]).is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }
}

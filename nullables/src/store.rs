//! Nullable preference store: thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use kyc_store::{PreferenceStore, StoreError};

/// An in-memory preference store.
#[derive(Default)]
pub struct NullPreferenceStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl NullPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `entries`.
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        store.entries.lock().unwrap().extend(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        store
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }

    /// Number of `set` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl PreferenceStore for NullPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        *self.writes.lock().unwrap() += 1;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

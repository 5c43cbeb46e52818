//! Key-value preference storage trait.

use crate::StoreError;

/// A small string key-value store owned by the host app.
///
/// No locking discipline beyond "last writer wins" is expected of
/// implementations.
pub trait PreferenceStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Delete several keys.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

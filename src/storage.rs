//! Key-value persistence used by the record store.
//!
//! The store only needs three synchronous operations on byte strings. Each
//! call is atomic for its single key; nothing spans keys.

use std::collections::HashMap;

use crate::app_response::AppResponse;

pub trait KeyValueStorage {
    /// Returns the stored bytes, or `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppResponse>;

    /// Replaces the value under `key`.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), AppResponse>;

    /// Deletes `key`. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), AppResponse>;
}

/// In-process storage with no durability.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppResponse> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), AppResponse> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AppResponse> {
        self.entries.remove(key);
        Ok(())
    }
}

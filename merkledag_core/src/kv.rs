//! Key-value backing stores.
//!
//! The DAG only needs four operations from its store, all keyed by opaque
//! bytes. Keys written by this crate are always content addresses of the
//! value, so writing the same key twice always writes the same value.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A key-value store holding encoded objects.
///
/// Implementations must be safe for concurrent callers: parallel builds call
/// `put` from several threads and resolution may run alongside.
pub trait KvStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Read the value under `key`. Returns `Ok(None)` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Check whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool>;

    /// Delete `key`. Returns `true` if it existed.
    fn delete(&self, key: &[u8]) -> Result<bool>;
}

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    ///
    /// A poisoned lock is recovered: entries are written whole under the
    /// lock, so the map stays consistent after a panicking writer.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl KvStore for MemoryStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut map = self
            .entries
            .write()
            .map_err(|e| Error::store_write(key, e))?;
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(|e| Error::store_read(key, e))?;
        Ok(map.get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        let map = self.entries.read().map_err(|e| Error::store_read(key, e))?;
        Ok(map.contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut map = self
            .entries
            .write()
            .map_err(|e| Error::store_write(key, e))?;
        Ok(map.remove(key).is_some())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .finish()
    }
}

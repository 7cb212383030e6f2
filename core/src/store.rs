//! Local persistent key/value store.
//!
//! Holds autosave records and per-script preferences. Two backends:
//! - `InMemory`: thread-safe map, used by tests and by hosts that provide
//!   their own durability.
//! - `Redb`: ACID-backed file storage using `redb`, durable across restarts.
//!
//! Values are strings. A value that is not valid UTF-8 on disk is reported as
//! absent. Clones share the same underlying storage, so one store can back
//! several open editors; keys carry the full document identity.

use crate::error::StoreError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.remove(key);
        Ok(())
    }

    /// Copy of all entries.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Redb-backed store.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<redb::Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Values are raw bytes so that a corrupted entry can be told apart from a missing one.
    const TABLE_DEF: redb::TableDefinition<'static, &'static str, &'static [u8]> =
        redb::TableDefinition::new("local_store");

    /// Create or open a redb database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let db = redb::Database::create(path.as_ref())?;
        // Make sure the table exists so read transactions never fail on a fresh file.
        let txn = db.begin_write()?;
        txn.open_table(Self::TABLE_DEF)?;
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(Self::TABLE_DEF)?;
        let Some(raw) = table.get(key)? else {
            return Ok(None);
        };
        match std::str::from_utf8(raw.value()) {
            Ok(s) => Ok(Some(s.to_string())),
            Err(_) => {
                tracing::warn!(key, "ignoring stored value that is not UTF-8");
                Ok(None)
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_raw(key, value.as_bytes())
    }

    /// Write raw bytes under `key`.
    pub fn set_raw(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(Self::TABLE_DEF)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(Self::TABLE_DEF)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// Backend switch used by the rest of the crate.
#[derive(Clone, Debug)]
pub enum LocalStore {
    InMemory(MemoryStore),
    Redb(RedbStore),
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl LocalStore {
    pub fn new_in_memory() -> Self {
        LocalStore::InMemory(MemoryStore::new())
    }

    /// Open a redb-backed store at `path`.
    pub fn new_redb<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(LocalStore::Redb(RedbStore::open(path)?))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            LocalStore::InMemory(m) => m.get(key),
            LocalStore::Redb(r) => r.get(key),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            LocalStore::InMemory(m) => m.set(key, value),
            LocalStore::Redb(r) => r.set(key, value),
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            LocalStore::InMemory(m) => m.remove(key),
            LocalStore::Redb(r) => r.remove(key),
        }
    }

    /// Read a value, logging and swallowing store failures.
    pub fn get_or_none(&self, key: &str) -> Option<String> {
        self.get(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "store read failed");
            None
        })
    }

    /// Write a value, logging store failures.
    pub fn set_logged(&self, key: &str, value: &str) {
        if let Err(e) = self.set(key, value) {
            tracing::warn!(key, error = %e, "store write failed");
        }
    }

    /// Remove a value, logging store failures.
    pub fn remove_logged(&self, key: &str) {
        if let Err(e) = self.remove(key) {
            tracing::warn!(key, error = %e, "store remove failed");
        }
    }
}

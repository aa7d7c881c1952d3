//! Durable key/value storage behind the record store and pending queue

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};

/// Keys persisted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Collections,
    Deductions,
    Batches,
    PendingSync,
    LastSync,
}

impl StorageKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Deductions => "deductions",
            Self::Batches => "batches",
            Self::PendingSync => "pending_sync",
            Self::LastSync => "last_sync",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized-text storage. A write returns only once the value is durable.
pub trait Storage: Send + Sync {
    /// Read the value for a key; `None` when it was never written
    fn read(&self, key: StorageKey) -> Result<Option<String>>;

    /// Replace the value for a key
    fn write(&self, key: StorageKey, value: &str) -> Result<()>;

    /// Replace several values; implementations may make this atomic
    fn write_all(&self, entries: &[(StorageKey, String)]) -> Result<()> {
        for (key, value) in entries {
            self.write(*key, value)?;
        }
        Ok(())
    }
}

/// `SQLite` implementation of [`Storage`]
pub struct SqliteStorage {
    db: Mutex<Database>,
}

impl SqliteStorage {
    /// Open (or create) the storage file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory storage (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub const fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::Storage("storage lock poisoned".to_string()))
    }
}

impl Storage for SqliteStorage {
    fn read(&self, key: StorageKey) -> Result<Option<String>> {
        let db = self.lock()?;
        let result = db.connection().query_row(
            "SELECT value FROM kv_entries WHERE key = ?",
            params![key.as_str()],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: StorageKey, value: &str) -> Result<()> {
        let db = self.lock()?;
        upsert_entry(db.connection(), key, value)?;
        tracing::debug!("Persisted {key} ({} bytes)", value.len());
        Ok(())
    }

    fn write_all(&self, entries: &[(StorageKey, String)]) -> Result<()> {
        let db = self.lock()?;
        let tx = db.connection().unchecked_transaction()?;
        for (key, value) in entries {
            upsert_entry(&tx, *key, value)?;
        }
        tx.commit()?;
        tracing::debug!("Persisted {} keys in one transaction", entries.len());
        Ok(())
    }
}

fn upsert_entry(conn: &rusqlite::Connection, key: StorageKey, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key.as_str(), value, crate::util::now_millis()],
    )?;
    Ok(())
}

/// Process-local [`Storage`], for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<StorageKey, String>>,
    #[cfg(test)]
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<StorageKey, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("storage lock poisoned".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Storage("disk full".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    const fn check_writable(&self) -> Result<()> {
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: StorageKey) -> Result<Option<String>> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn write(&self, key: StorageKey, value: &str) -> Result<()> {
        self.check_writable()?;
        self.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn write_all(&self, entries: &[(StorageKey, String)]) -> Result<()> {
        self.check_writable()?;
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert(*key, value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sqlite_read_missing_key() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.read(StorageKey::Collections).unwrap(), None);
    }

    #[test]
    fn test_sqlite_write_overwrites() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write(StorageKey::LastSync, "a").unwrap();
        storage.write(StorageKey::LastSync, "b").unwrap();
        assert_eq!(
            storage.read(StorageKey::LastSync).unwrap().as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("milkbook.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage
                .write_all(&[
                    (StorageKey::Collections, "[]".to_string()),
                    (StorageKey::PendingSync, "[1]".to_string()),
                ])
                .unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.read(StorageKey::PendingSync).unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(
            storage.read(StorageKey::Collections).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_memory_storage_write_failure_keeps_old_value() {
        let storage = MemoryStorage::new();
        storage.write(StorageKey::Batches, "old").unwrap();
        storage.set_fail_writes(true);
        assert!(storage.write(StorageKey::Batches, "new").is_err());
        assert_eq!(
            storage.read(StorageKey::Batches).unwrap().as_deref(),
            Some("old")
        );
    }

    #[test]
    fn test_storage_keys_match_persisted_names() {
        assert_eq!(StorageKey::PendingSync.as_str(), "pending_sync");
        assert_eq!(StorageKey::LastSync.to_string(), "last_sync");
    }
}

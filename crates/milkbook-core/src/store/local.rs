//! Record store and queue committed together

use std::sync::Arc;

use super::{load_json, PendingOperation, PendingQueue, RecordSet, RecordStore};
use crate::db::{Storage, StorageKey};
use crate::error::Result;
use crate::util::{millis_to_rfc3339, now_millis};

/// Everything the device holds locally.
///
/// A local mutation touches the records and the queue; [`LocalState::record`]
/// writes both in one storage batch so a crash cannot keep one without the
/// other.
pub struct LocalState {
    store: RecordStore,
    queue: PendingQueue,
    last_sync: Option<String>,
    storage: Arc<dyn Storage>,
}

impl LocalState {
    /// Restore records, queue and last sync time. Never fails.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let last_sync: Option<String> = load_json(storage.as_ref(), StorageKey::LastSync);
        Self {
            store: RecordStore::load(storage.clone()),
            queue: PendingQueue::load(storage.clone()),
            last_sync,
            storage,
        }
    }

    /// Re-read everything from storage, dropping in-memory state
    pub fn reload(&mut self) {
        *self = Self::load(self.storage.clone());
    }

    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    pub const fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// RFC 3339 time of the last completed pull
    pub fn last_sync(&self) -> Option<&str> {
        self.last_sync.as_deref()
    }

    /// Apply an operation locally and append it to the queue
    pub fn record(&mut self, operation: PendingOperation) -> Result<()> {
        let Self { store, queue, .. } = self;
        queue.enqueue_with(operation, |operation, queue_entry| {
            store.apply_with(operation, vec![queue_entry])
        })
    }

    /// Drop the first `count` queued operations after the remote accepted them
    pub fn acknowledge(&mut self, count: usize) -> Result<()> {
        self.queue.acknowledge(count)
    }

    /// Make a pulled snapshot the local state.
    ///
    /// Operations still queued (enqueued after the last push was built) are
    /// replayed on top so they stay visible until they are flushed.
    pub fn apply_pull(&mut self, snapshot: RecordSet) -> Result<()> {
        let mut records = snapshot;
        for operation in &self.queue {
            operation.apply(&mut records);
        }

        let last_sync = millis_to_rfc3339(now_millis());
        let entry = (StorageKey::LastSync, serde_json::to_string(&last_sync)?);
        self.store.replace_all_with(records, vec![entry])?;
        self.last_sync = Some(last_sync);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use crate::models::Batch;
    use crate::testing::{collection, deduction};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_persists_store_and_queue_together() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        local
            .record(PendingOperation::AddCollection(collection("BUID1", "M-010124", 10.0)))
            .unwrap();

        let reloaded = LocalState::load(storage);
        assert_eq!(reloaded.store().collections().len(), 1);
        assert_eq!(reloaded.queue().len(), 1);
        assert_eq!(reloaded.store().batches(), &[Batch::new("M-010124")]);
    }

    #[test]
    fn test_failed_record_changes_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        storage.set_fail_writes(true);

        assert!(local
            .record(PendingOperation::AddCollection(collection("BUID1", "M-010124", 10.0)))
            .is_err());
        assert!(local.store().collections().is_empty());
        assert!(local.queue().is_empty());
    }

    #[test]
    fn test_apply_pull_replays_still_queued_operations() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        local
            .record(PendingOperation::AddCollection(collection("BUID2", "E-010124", 4.0)))
            .unwrap();

        let snapshot = RecordSet {
            collections: vec![collection("BUID1", "M-010124", 10.0)],
            deductions: Vec::new(),
            batches: vec![Batch::new("M-010124")],
        };
        local.apply_pull(snapshot).unwrap();

        let ids = local
            .store()
            .collections()
            .iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["BUID1", "BUID2"]);
        assert_eq!(local.queue().len(), 1);
        assert!(local.last_sync().is_some());

        let reloaded = LocalState::load(storage);
        assert_eq!(reloaded.store().records(), local.store().records());
        assert_eq!(reloaded.last_sync(), local.last_sync());
    }

    #[test]
    fn test_reload_discards_unpersisted_view() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        let mut other = LocalState::load(storage);
        other
            .record(PendingOperation::AddCollection(collection("BUID1", "M-010124", 1.0)))
            .unwrap();

        assert!(local.store().collections().is_empty());
        local.reload();
        assert_eq!(local.store().collections().len(), 1);
    }

    #[test]
    fn test_record_writes_touched_keys_with_queue() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        local
            .record(PendingOperation::AddDeduction(deduction("BUID1", "M-010124", 2.0)))
            .unwrap();

        assert!(storage.read(StorageKey::Deductions).unwrap().is_some());
        assert!(storage.read(StorageKey::PendingSync).unwrap().is_some());
        assert_eq!(storage.read(StorageKey::Collections).unwrap(), None);
    }

    #[test]
    fn test_failed_apply_pull_keeps_previous_state() {
        let storage = Arc::new(MemoryStorage::new());
        let mut local = LocalState::load(storage.clone());
        local
            .record(PendingOperation::AddCollection(collection("BUID1", "M-010124", 10.0)))
            .unwrap();

        storage.set_fail_writes(true);
        let snapshot = RecordSet {
            collections: vec![collection("BUID9", "E-020124", 3.0)],
            deductions: Vec::new(),
            batches: vec![Batch::new("E-020124")],
        };
        assert!(local.apply_pull(snapshot).is_err());
        assert_eq!(local.store().collections().len(), 1);
        assert_eq!(local.store().collections()[0].id.as_str(), "BUID1");
        assert!(local.last_sync().is_none());
        assert_eq!(LocalState::load(storage).store().records(), local.store().records());
    }
}

//! Pending operation queue

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{load_json, RecordSet};
use crate::db::{Storage, StorageKey};
use crate::error::Result;
use crate::models::{CollectionRecord, DeductionRecord};

/// A local mutation not yet confirmed by the remote service.
///
/// Each variant owns a copy of its data, so later local edits cannot change
/// an operation that is already queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PendingOperation {
    AddCollection(CollectionRecord),
    EditCollection(CollectionRecord),
    AddDeduction(DeductionRecord),
    SetBatchDispatched { batch_id: String, dispatched: bool },
}

impl PendingOperation {
    /// Operation type as understood by the remote service
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AddCollection(_) => "add",
            Self::EditCollection(_) => "edit",
            Self::AddDeduction(_) => "deduction",
            Self::SetBatchDispatched { .. } => "batch_dispatch",
        }
    }

    /// Batch the operation touches
    pub fn batch_id(&self) -> &str {
        match self {
            Self::AddCollection(record) | Self::EditCollection(record) => &record.batch_id,
            Self::AddDeduction(record) => &record.batch_id,
            Self::SetBatchDispatched { batch_id, .. } => batch_id,
        }
    }

    /// Record keys that change when the operation is applied
    pub(crate) const fn touched_keys(&self) -> &'static [StorageKey] {
        match self {
            Self::AddCollection(_) | Self::EditCollection(_) => {
                &[StorageKey::Collections, StorageKey::Batches]
            }
            Self::AddDeduction(_) => &[StorageKey::Deductions],
            Self::SetBatchDispatched { .. } => &[StorageKey::Batches],
        }
    }

    /// Replay the operation onto a record set, the way the remote applies it
    pub fn apply(&self, records: &mut RecordSet) {
        match self {
            Self::AddCollection(record) | Self::EditCollection(record) => {
                records.upsert_collection(record.clone());
            }
            Self::AddDeduction(record) => records.upsert_deduction(record.clone()),
            Self::SetBatchDispatched {
                batch_id,
                dispatched,
            } => records.set_batch_dispatched(batch_id, *dispatched),
        }
    }
}

/// Ordered, durable log of pending operations
pub struct PendingQueue {
    operations: Vec<PendingOperation>,
    storage: Arc<dyn Storage>,
}

impl PendingQueue {
    /// Restore the queue; malformed content loads as an empty queue
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let operations: Vec<PendingOperation> = load_json(storage.as_ref(), StorageKey::PendingSync);
        tracing::debug!(pending = operations.len(), "Loaded pending queue");
        Self {
            operations,
            storage,
        }
    }

    /// Append an operation and persist the queue
    pub fn enqueue(&mut self, operation: PendingOperation) -> Result<()> {
        let storage = self.storage.clone();
        self.enqueue_with(operation, |_, (key, value)| storage.write(key, &value))
    }

    /// Append an operation, handing the queue entry to `write`.
    ///
    /// `write` may persist other state in the same batch; the operation is
    /// only appended once it returns `Ok`.
    pub(crate) fn enqueue_with<F>(&mut self, operation: PendingOperation, write: F) -> Result<()>
    where
        F: FnOnce(&PendingOperation, (StorageKey, String)) -> Result<()>,
    {
        let mut next = self.operations.clone();
        next.push(operation);
        let entry = Self::storage_entry(&next)?;
        if let Some(operation) = next.last() {
            write(operation, entry)?;
        }
        self.operations = next;
        Ok(())
    }

    /// Copy of the current contents; the queue is left untouched
    pub fn drain(&self) -> Vec<PendingOperation> {
        self.operations.clone()
    }

    /// Remove everything and persist the empty queue
    pub fn clear(&mut self) -> Result<()> {
        self.acknowledge(self.operations.len())
    }

    /// Remove the first `count` operations, the ones the remote accepted
    pub fn acknowledge(&mut self, count: usize) -> Result<()> {
        let count = count.min(self.operations.len());
        if count == 0 {
            return Ok(());
        }
        let next = self.operations[count..].to_vec();
        self.persist(next)?;
        tracing::debug!(
            acknowledged = count,
            remaining = self.operations.len(),
            "Acknowledged pending operations"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PendingOperation> {
        self.operations.iter()
    }

    fn storage_entry(operations: &[PendingOperation]) -> Result<(StorageKey, String)> {
        Ok((StorageKey::PendingSync, serde_json::to_string(operations)?))
    }

    fn persist(&mut self, next: Vec<PendingOperation>) -> Result<()> {
        let (key, value) = Self::storage_entry(&next)?;
        self.storage.write(key, &value)?;
        self.operations = next;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PendingQueue {
    type Item = &'a PendingOperation;
    type IntoIter = std::slice::Iter<'a, PendingOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! Record store and pending operation queue
//!
//! Both persist through a [`Storage`] handle and follow the same discipline:
//! the next state is built on a copy, written, and only then swapped in, so a
//! failed write leaves memory and disk agreeing on the previous state.

mod local;
mod queue;

use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use local::LocalState;
pub use queue::{PendingOperation, PendingQueue};

use crate::aggregate::{compute_batch_totals, BatchTotals};
use crate::db::{Storage, StorageKey};
use crate::error::Result;
use crate::models::{Batch, CollectionRecord, DeductionRecord, RecordId};

/// Collections, deductions and batches as one value.
///
/// This is the content of the local store, the payload of a pull, and the
/// target operations are replayed onto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub collections: Vec<CollectionRecord>,
    pub deductions: Vec<DeductionRecord>,
    pub batches: Vec<Batch>,
}

impl RecordSet {
    pub fn collection(&self, id: &RecordId) -> Option<&CollectionRecord> {
        self.collections.iter().find(|record| &record.id == id)
    }

    pub fn batch(&self, batch_id: &str) -> Option<&Batch> {
        self.batches.iter().find(|batch| batch.batch_id == batch_id)
    }

    /// Create the batch if it is unknown. Returns whether it was created.
    pub fn ensure_batch(&mut self, batch_id: &str) -> bool {
        if self.batch(batch_id).is_some() {
            return false;
        }
        self.batches.push(Batch::new(batch_id));
        true
    }

    /// Replace the collection with the same id, or append it
    pub fn upsert_collection(&mut self, record: CollectionRecord) {
        self.ensure_batch(&record.batch_id);
        if let Some(existing) = self.collections.iter_mut().find(|c| c.id == record.id) {
            *existing = record;
        } else {
            self.collections.push(record);
        }
    }

    /// Replace the deduction with the same id, or append it
    pub fn upsert_deduction(&mut self, record: DeductionRecord) {
        if let Some(existing) = self.deductions.iter_mut().find(|d| d.id == record.id) {
            *existing = record;
        } else {
            self.deductions.push(record);
        }
    }

    pub fn set_batch_dispatched(&mut self, batch_id: &str, dispatched: bool) {
        self.ensure_batch(batch_id);
        if let Some(batch) = self.batches.iter_mut().find(|b| b.batch_id == batch_id) {
            batch.dispatched = dispatched;
        }
    }

    pub fn batch_totals(&self) -> BatchTotals {
        compute_batch_totals(&self.collections, &self.deductions, &self.batches)
    }

    /// Serialized form of every record key
    fn storage_entries(&self) -> Result<Vec<(StorageKey, String)>> {
        Ok(vec![
            (StorageKey::Collections, serde_json::to_string(&self.collections)?),
            (StorageKey::Deductions, serde_json::to_string(&self.deductions)?),
            (StorageKey::Batches, serde_json::to_string(&self.batches)?),
        ])
    }
}

const RECORD_KEYS: [StorageKey; 3] = [
    StorageKey::Collections,
    StorageKey::Deductions,
    StorageKey::Batches,
];

/// Durable owner of all collection, deduction and batch records
pub struct RecordStore {
    records: RecordSet,
    storage: Arc<dyn Storage>,
}

impl RecordStore {
    /// Restore the records from storage.
    ///
    /// Missing or malformed keys load as empty; this never fails.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let records = RecordSet {
            collections: load_json(storage.as_ref(), StorageKey::Collections),
            deductions: load_json(storage.as_ref(), StorageKey::Deductions),
            batches: load_json(storage.as_ref(), StorageKey::Batches),
        };
        tracing::debug!(
            collections = records.collections.len(),
            deductions = records.deductions.len(),
            batches = records.batches.len(),
            "Loaded local records"
        );
        Self { records, storage }
    }

    pub const fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn collections(&self) -> &[CollectionRecord] {
        &self.records.collections
    }

    pub fn deductions(&self) -> &[DeductionRecord] {
        &self.records.deductions
    }

    pub fn batches(&self) -> &[Batch] {
        &self.records.batches
    }

    pub fn collection(&self, id: &RecordId) -> Option<&CollectionRecord> {
        self.records.collection(id)
    }

    pub fn batch(&self, batch_id: &str) -> Option<&Batch> {
        self.records.batch(batch_id)
    }

    /// Substitute the entire state and persist it
    pub fn replace_all(&mut self, records: RecordSet) -> Result<()> {
        self.replace_all_with(records, Vec::new())
    }

    /// [`RecordStore::replace_all`], writing `extra` in the same batch
    pub(crate) fn replace_all_with(
        &mut self,
        records: RecordSet,
        extra: Vec<(StorageKey, String)>,
    ) -> Result<()> {
        self.persist(records, &RECORD_KEYS, extra)
    }

    /// Insert or replace a collection; creates its batch when unseen
    pub fn upsert_collection(&mut self, record: CollectionRecord) -> Result<()> {
        self.apply_with(&PendingOperation::AddCollection(record), Vec::new())
    }

    pub fn upsert_deduction(&mut self, record: DeductionRecord) -> Result<()> {
        self.apply_with(&PendingOperation::AddDeduction(record), Vec::new())
    }

    pub fn set_batch_dispatched(&mut self, batch_id: &str, dispatched: bool) -> Result<()> {
        let operation = PendingOperation::SetBatchDispatched {
            batch_id: batch_id.to_string(),
            dispatched,
        };
        self.apply_with(&operation, Vec::new())
    }

    pub fn ensure_batch(&mut self, batch_id: &str) -> Result<()> {
        let mut next = self.records.clone();
        if !next.ensure_batch(batch_id) {
            return Ok(());
        }
        self.persist(next, &[StorageKey::Batches], Vec::new())
    }

    /// Apply an operation and persist the keys it touches, plus `extra`
    pub(crate) fn apply_with(
        &mut self,
        operation: &PendingOperation,
        extra: Vec<(StorageKey, String)>,
    ) -> Result<()> {
        let mut next = self.records.clone();
        operation.apply(&mut next);
        self.persist(next, operation.touched_keys(), extra)
    }

    fn persist(
        &mut self,
        next: RecordSet,
        keys: &[StorageKey],
        extra: Vec<(StorageKey, String)>,
    ) -> Result<()> {
        let mut entries = next
            .storage_entries()?
            .into_iter()
            .filter(|(key, _)| keys.contains(key))
            .collect::<Vec<_>>();
        entries.extend(extra);
        self.storage.write_all(&entries)?;
        self.records = next;
        Ok(())
    }
}

/// Read and decode a JSON value, falling back to the default on any problem
pub(crate) fn load_json<T>(storage: &dyn Storage, key: StorageKey) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.read(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|error| {
            tracing::warn!("Discarding malformed local data for {key}: {error}");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(error) => {
            tracing::warn!("Failed to read local data for {key}: {error}");
            T::default()
        }
    }
}

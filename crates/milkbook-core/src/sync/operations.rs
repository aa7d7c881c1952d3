//! Local mutations and reads.
//!
//! Every mutation validates first, then commits the record and its queued
//! operation together. Nothing here waits on the network.

use super::{DerivedView, SyncEngine};
use crate::aggregate::BatchTotals;
use crate::error::{Error, Result, ValidationError};
use crate::models::{CollectionInput, CollectionRecord, DeductionInput, DeductionRecord, RecordId};
use crate::remote::RemoteGateway;
use crate::store::PendingOperation;
use crate::util::now_millis;

impl<G: RemoteGateway> SyncEngine<G> {
    /// Record a new collection under a fresh id
    pub async fn add_collection(
        &self,
        input: CollectionInput,
    ) -> Result<(CollectionRecord, DerivedView)> {
        input.require_registered_collector()?;
        let record = input.into_record(self.ids.next(), now_millis())?;

        let mut local = self.local.lock().await;
        local.record(PendingOperation::AddCollection(record.clone()))?;
        tracing::info!(id = %record.id, batch = %record.batch_id, "Collection added");
        Ok((record, self.derive(&local)))
    }

    /// Replace the fields of an existing collection, keeping its id and
    /// creation time.
    ///
    /// A collector outside the registered set is accepted only when the
    /// record already had it.
    pub async fn edit_collection(
        &self,
        id: &RecordId,
        input: CollectionInput,
    ) -> Result<(CollectionRecord, DerivedView)> {
        let mut local = self.local.lock().await;
        let existing = local
            .store()
            .collection(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if existing.collector != input.collector {
            input.require_registered_collector()?;
        }
        let created_at = existing.created_at;

        let record = input.into_record(id.clone(), created_at)?;
        local.record(PendingOperation::EditCollection(record.clone()))?;
        tracing::info!(id = %record.id, batch = %record.batch_id, "Collection edited");
        Ok((record, self.derive(&local)))
    }

    /// Subtract a quantity from a batch that exists and is still open
    pub async fn add_deduction(
        &self,
        batch_id: &str,
        input: DeductionInput,
    ) -> Result<(DeductionRecord, DerivedView)> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Err(ValidationError::MissingBatch.into());
        }

        let mut local = self.local.lock().await;
        match local.store().batch(batch_id) {
            None => return Err(ValidationError::UnknownBatch(batch_id.to_string()).into()),
            Some(batch) if batch.dispatched => {
                return Err(ValidationError::BatchDispatched(batch_id.to_string()).into());
            }
            Some(_) => {}
        }

        let record = input.into_record(self.ids.next(), batch_id, now_millis())?;
        local.record(PendingOperation::AddDeduction(record.clone()))?;
        tracing::info!(id = %record.id, batch = batch_id, "Deduction added");
        Ok((record, self.derive(&local)))
    }

    /// Mark a batch as shipped. A dispatched batch stays dispatched; clearing
    /// the flag on an open batch changes nothing and queues nothing.
    pub async fn set_batch_dispatched(
        &self,
        batch_id: &str,
        dispatched: bool,
    ) -> Result<DerivedView> {
        let batch_id = batch_id.trim();
        let mut local = self.local.lock().await;
        match local.store().batch(batch_id) {
            None => return Err(ValidationError::UnknownBatch(batch_id.to_string()).into()),
            Some(batch) if batch.dispatched => {
                return Err(ValidationError::BatchDispatched(batch_id.to_string()).into());
            }
            Some(_) if !dispatched => return Ok(self.derive(&local)),
            Some(_) => {}
        }

        local.record(PendingOperation::SetBatchDispatched {
            batch_id: batch_id.to_string(),
            dispatched,
        })?;
        tracing::info!(batch = batch_id, dispatched, "Batch dispatch updated");
        Ok(self.derive(&local))
    }

    pub async fn batch_totals(&self) -> BatchTotals {
        self.local.lock().await.store().records().batch_totals()
    }

    pub async fn collections(&self) -> Vec<CollectionRecord> {
        self.local.lock().await.store().collections().to_vec()
    }

    pub async fn collection(&self, id: &RecordId) -> Option<CollectionRecord> {
        self.local.lock().await.store().collection(id).cloned()
    }

    pub async fn deductions(&self) -> Vec<DeductionRecord> {
        self.local.lock().await.store().deductions().to_vec()
    }

    /// Queued operations in issue order
    pub async fn pending_operations(&self) -> Vec<PendingOperation> {
        self.local.lock().await.queue().drain()
    }

    pub async fn last_sync(&self) -> Option<String> {
        self.local.lock().await.last_sync().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::SyncConfig;
    use crate::db::MemoryStorage;
    use crate::models::{AlcoholTest, Collector};
    use crate::store::RecordStore;
    use crate::sync::ConnectivitySignal;
    use crate::testing::{collection, MemoryRemote};
    use pretty_assertions::assert_eq;

    fn offline_engine() -> (SyncEngine<Arc<MemoryRemote>>, ConnectivitySignal) {
        let signal = ConnectivitySignal::new(false);
        let engine = SyncEngine::new(
            Arc::new(MemoryStorage::new()),
            MemoryRemote::new(),
            signal.subscribe(),
            SyncConfig::default(),
        );
        (engine, signal)
    }

    fn input(batch: &str, quantity: Option<f64>) -> CollectionInput {
        CollectionInput {
            collector: Collector::Rocky,
            arrival_time: 1_704_090_600_000,
            quantity_liters: quantity,
            batch_id: batch.to_string(),
            ..CollectionInput::default()
        }
    }

    fn validation(error: Error) -> ValidationError {
        match error {
            Error::Validation(error) => error,
            other => panic!("expected a validation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_add_collection_assigns_id_and_queues() {
        let (engine, _signal) = offline_engine();
        let (record, view) = engine
            .add_collection(CollectionInput {
                fat: Some(4.4),
                snf: Some(-1.0),
                alcohol_test: AlcoholTest::Negative,
                ..input(" M-010124 ", Some(12.0))
            })
            .await
            .unwrap();

        assert!(record.id.as_str().starts_with("BUID"));
        assert_eq!(record.batch_id, "M-010124");
        assert_eq!(record.fat, Some(4.4));
        assert_eq!(record.snf, None);
        assert_eq!(view.pending_operations, 1);
        assert_eq!(
            engine.pending_operations().await,
            vec![PendingOperation::AddCollection(record.clone())]
        );
        assert_eq!(engine.collection(&record.id).await, Some(record));
    }

    #[tokio::test]
    async fn test_rapid_adds_get_distinct_ids() {
        let (engine, _signal) = offline_engine();
        let (first, _) = engine.add_collection(input("M-010124", Some(1.0))).await.unwrap();
        let (second, _) = engine.add_collection(input("M-010124", Some(1.0))).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(engine.collections().await.len(), 2);
    }

    #[tokio::test]
    async fn test_add_collection_rejects_bad_input_without_mutation() {
        let (engine, _signal) = offline_engine();

        let missing = engine.add_collection(input("M-010124", None)).await.unwrap_err();
        assert_eq!(validation(missing), ValidationError::MissingQuantity);

        let negative = engine
            .add_collection(input("M-010124", Some(-2.0)))
            .await
            .unwrap_err();
        assert_eq!(validation(negative), ValidationError::InvalidQuantity(-2.0));

        let no_batch = engine.add_collection(input("  ", Some(2.0))).await.unwrap_err();
        assert_eq!(validation(no_batch), ValidationError::MissingBatch);

        let bad_fat = engine
            .add_collection(CollectionInput {
                fat: Some(f64::NAN),
                ..input("M-010124", Some(2.0))
            })
            .await
            .unwrap_err();
        assert_eq!(validation(bad_fat), ValidationError::InvalidMeasurement("FAT"));

        assert!(engine.collections().await.is_empty());
        assert!(engine.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_keeps_id_and_created_at() {
        let (engine, _signal) = offline_engine();
        let (original, _) = engine
            .add_collection(input("M-010124", Some(10.0)))
            .await
            .unwrap();

        let (edited, view) = engine
            .edit_collection(
                &original.id,
                CollectionInput {
                    collector: Collector::Jagga,
                    ..input("E-010124", Some(8.0))
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.collector, Collector::Jagga);
        assert_eq!(engine.collections().await, vec![edited.clone()]);
        assert_eq!(view.pending_operations, 2);
        assert!(view.batch_totals.get("M-010124").is_none());
        let net = view.batch_totals.get("E-010124").unwrap().net_liters;
        assert!((net - 8.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_edit_unknown_collection_is_not_found() {
        let (engine, _signal) = offline_engine();
        let error = engine
            .edit_collection(&RecordId::from("BUID0"), input("M-010124", Some(1.0)))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(id) if id == "BUID0"));
    }

    #[tokio::test]
    async fn test_deduction_needs_open_existing_batch() {
        let (engine, _signal) = offline_engine();

        let unknown = engine
            .add_deduction("M-010124", DeductionInput::new("spilled", 1.0))
            .await
            .unwrap_err();
        assert_eq!(
            validation(unknown),
            ValidationError::UnknownBatch("M-010124".to_string())
        );

        engine.add_collection(input("M-010124", Some(10.0))).await.unwrap();
        let no_reason = engine
            .add_deduction("M-010124", DeductionInput::new(" ", 1.0))
            .await
            .unwrap_err();
        assert_eq!(validation(no_reason), ValidationError::MissingReason);

        engine.set_batch_dispatched("M-010124", true).await.unwrap();
        let dispatched = engine
            .add_deduction("M-010124", DeductionInput::new("spilled", 1.0))
            .await
            .unwrap_err();
        assert_eq!(
            validation(dispatched),
            ValidationError::BatchDispatched("M-010124".to_string())
        );

        assert!(engine.deductions().await.is_empty());
        assert_eq!(engine.pending_operations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_rules() {
        let (engine, _signal) = offline_engine();

        let unknown = engine.set_batch_dispatched("M-010124", true).await.unwrap_err();
        assert_eq!(
            validation(unknown),
            ValidationError::UnknownBatch("M-010124".to_string())
        );

        engine.add_collection(input("M-010124", Some(10.0))).await.unwrap();
        let view = engine.set_batch_dispatched("M-010124", true).await.unwrap();
        assert!(view.batch_totals.get("M-010124").unwrap().dispatched);

        let undo = engine.set_batch_dispatched("M-010124", false).await.unwrap_err();
        assert_eq!(
            validation(undo),
            ValidationError::BatchDispatched("M-010124".to_string())
        );
        assert!(engine.batch_totals().await.get("M-010124").unwrap().dispatched);
    }

    #[tokio::test]
    async fn test_clearing_dispatch_on_open_batch_queues_nothing() {
        let (engine, _signal) = offline_engine();
        engine.add_collection(input("M-010124", Some(10.0))).await.unwrap();

        let view = engine.set_batch_dispatched("M-010124", false).await.unwrap();
        assert_eq!(view.pending_operations, 1);
        assert_eq!(engine.pending_operations().await.len(), 1);
        assert!(!engine.batch_totals().await.get("M-010124").unwrap().dispatched);
    }

    #[tokio::test]
    async fn test_edit_keeps_unregistered_collector_from_remote() {
        let storage = Arc::new(MemoryStorage::new());
        let mut pulled = collection("BUID1", "M-010124", 10.0);
        pulled.collector = Collector::Other("Meena".to_string());
        RecordStore::load(storage.clone())
            .upsert_collection(pulled.clone())
            .unwrap();
        let signal = ConnectivitySignal::new(false);
        let engine = SyncEngine::new(
            storage,
            MemoryRemote::new(),
            signal.subscribe(),
            SyncConfig::default(),
        );

        let mut changes = CollectionInput::from_record(&pulled);
        changes.quantity_liters = Some(12.0);
        let (edited, _) = engine.edit_collection(&pulled.id, changes).await.unwrap();
        assert_eq!(edited.collector, Collector::Other("Meena".to_string()));
        assert!((edited.quantity_liters - 12.0).abs() < f64::EPSILON);

        let mut renamed = CollectionInput::from_record(&edited);
        renamed.collector = Collector::Other("Suresh".to_string());
        let error = engine.edit_collection(&pulled.id, renamed).await.unwrap_err();
        assert_eq!(
            validation(error),
            ValidationError::UnknownCollector("Suresh".to_string())
        );
        assert_eq!(engine.pending_operations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_unregistered_collector() {
        let (engine, _signal) = offline_engine();
        let error = engine
            .add_collection(CollectionInput {
                collector: Collector::Other("Meena".to_string()),
                ..input("M-010124", Some(5.0))
            })
            .await
            .unwrap_err();
        assert_eq!(
            validation(error),
            ValidationError::UnknownCollector("Meena".to_string())
        );
        assert!(engine.collections().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_rejects_mutation() {
        let storage = Arc::new(MemoryStorage::new());
        let signal = ConnectivitySignal::new(false);
        let engine = SyncEngine::new(
            storage.clone(),
            MemoryRemote::new(),
            signal.subscribe(),
            SyncConfig::default(),
        );

        storage.set_fail_writes(true);
        let error = engine
            .add_collection(input("M-010124", Some(1.0)))
            .await
            .unwrap_err();

        assert!(!error.is_retryable());
        assert!(engine.collections().await.is_empty());
        assert!(engine.pending_operations().await.is_empty());
        assert_eq!(engine.last_sync().await, None);
    }
}

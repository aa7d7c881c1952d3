//! Test fixtures and an in-memory remote

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::models::{AlcoholTest, CollectionRecord, Collector, DeductionRecord, RecordId};
use crate::remote::{RemoteError, RemoteGateway};
use crate::store::{PendingOperation, RecordSet};

pub const FIXTURE_TIME: i64 = 1_700_000_000_000;

pub fn collection(id: &str, batch: &str, quantity: f64) -> CollectionRecord {
    CollectionRecord {
        id: RecordId::from(id),
        collector: Collector::Raju,
        arrival_time: FIXTURE_TIME,
        quantity_liters: quantity,
        clr: Some(28.0),
        fat: None,
        snf: None,
        water_percent: None,
        mbrt_hours: None,
        alcohol_test: AlcoholTest::NotApplicable,
        batch_id: batch.to_string(),
        created_at: FIXTURE_TIME,
    }
}

pub fn deduction(id: &str, batch: &str, quantity: f64) -> DeductionRecord {
    DeductionRecord {
        id: RecordId::from(id),
        batch_id: batch.to_string(),
        reason: "spilled".to_string(),
        quantity_liters: quantity,
        created_at: FIXTURE_TIME,
    }
}

/// Remote that keeps its records in memory.
///
/// Pushes replay every operation onto a copy and commit it only when the
/// whole batch applied, like the real service.
#[derive(Default)]
pub struct MemoryRemote {
    records: Mutex<RecordSet>,
    received: Mutex<Vec<PendingOperation>>,
    fail_push: AtomicBool,
    fail_pull: AtomicBool,
    push_delay: Mutex<Option<Duration>>,
    hold_push: AtomicBool,
    push_entered: Notify,
    push_released: Notify,
    pushes: AtomicUsize,
    pulls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_records(records: RecordSet) -> Arc<Self> {
        let remote = Self::default();
        *remote.records.lock().unwrap() = records;
        Arc::new(remote)
    }

    pub fn records(&self) -> RecordSet {
        self.records.lock().unwrap().clone()
    }

    /// Every operation accepted so far, in push order
    pub fn received(&self) -> Vec<PendingOperation> {
        self.received.lock().unwrap().clone()
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_pull(&self, fail: bool) {
        self.fail_pull.store(fail, Ordering::SeqCst);
    }

    pub fn set_push_delay(&self, delay: Duration) {
        *self.push_delay.lock().unwrap() = Some(delay);
    }

    /// Make the next pushes wait for [`MemoryRemote::release_push`]
    pub fn hold_pushes(&self) {
        self.hold_push.store(true, Ordering::SeqCst);
    }

    /// Resolves once a held push has started
    pub async fn push_started(&self) {
        self.push_entered.notified().await;
    }

    pub fn release_push(&self) {
        self.hold_push.store(false, Ordering::SeqCst);
        self.push_released.notify_one();
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

impl RemoteGateway for MemoryRemote {
    async fn pull(&self) -> Result<RecordSet, RemoteError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pull.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("HTTP 503".to_string()));
        }
        Ok(self.records())
    }

    async fn push(&self, operations: &[PendingOperation]) -> Result<(), RemoteError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        if self.hold_push.load(Ordering::SeqCst) {
            self.push_entered.notify_one();
            self.push_released.notified().await;
        }
        let delay = *self.push_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("HTTP 500".to_string()));
        }

        let mut next = self.records();
        for operation in operations {
            operation.apply(&mut next);
        }
        *self.records.lock().unwrap() = next;
        self.received.lock().unwrap().extend_from_slice(operations);
        Ok(())
    }
}

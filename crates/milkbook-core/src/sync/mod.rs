//! Sync orchestrator.
//!
//! [`SyncEngine`] owns the local state and the remote gateway. Local
//! mutations commit immediately and queue an operation; a flush pushes the
//! queue in one request and then pulls the authoritative snapshot.
//!
//! The local state sits behind one async mutex that is never held across a
//! network call, so operators can keep recording while a flush is in flight.

mod operations;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::aggregate::BatchTotals;
use crate::config::SyncConfig;
use crate::db::Storage;
use crate::error::{Error, Result};
use crate::models::IdGenerator;
use crate::remote::{RemoteError, RemoteGateway};
use crate::state::SyncState;
use crate::store::LocalState;

/// Sender half of the connectivity signal.
///
/// Whoever knows about the network (an OS hook, a probe loop, a test) owns
/// this and reports changes; the engine holds the receiving side.
#[derive(Debug)]
pub struct ConnectivitySignal {
    sender: watch::Sender<bool>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        Self {
            sender: watch::Sender::new(online),
        }
    }

    /// Report the current connectivity; unchanged values are not re-sent
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// What front ends render after every operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub batch_totals: BatchTotals,
    pub pending_operations: usize,
    pub state: SyncState,
    pub last_sync: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Pushed `pushed` operations, then pulled `pulled` records
    Completed { pushed: usize, pulled: usize },
    /// Another flush was already running; nothing was done
    AlreadySyncing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub view: DerivedView,
}

pub struct SyncEngine<G> {
    local: Mutex<LocalState>,
    gateway: G,
    config: SyncConfig,
    ids: IdGenerator,
    state: watch::Sender<SyncState>,
    connectivity: watch::Receiver<bool>,
    syncing: AtomicBool,
}

impl<G: RemoteGateway> SyncEngine<G> {
    /// Open the engine over already persisted local data
    pub fn new(
        storage: Arc<dyn Storage>,
        gateway: G,
        connectivity: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> Self {
        let initial = if *connectivity.borrow() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };

        Self {
            local: Mutex::new(LocalState::load(storage)),
            gateway,
            config,
            ids: IdGenerator::new(),
            state: watch::Sender::new(initial),
            connectivity,
            syncing: AtomicBool::new(false),
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        *self.connectivity.borrow()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Initial pull when online with nothing queued.
    ///
    /// Local data is shown either way; a failed pull is only logged.
    pub async fn start(&self) -> DerivedView {
        if self.is_online() {
            match self.pull_if_idle().await {
                Ok(true) => tracing::info!("Loaded remote snapshot at startup"),
                Ok(false) => {}
                Err(error) => tracing::warn!(%error, "Startup pull failed; using local data"),
            }
        }
        self.view().await
    }

    /// Manual sync. Offline requests are rejected without touching state.
    pub async fn request_sync(&self) -> Result<SyncReport> {
        if !self.is_online() {
            return Err(Error::Offline);
        }
        self.flush().await
    }

    /// Reload local data, then pull when online with nothing queued
    pub async fn refresh(&self) -> Result<DerivedView> {
        self.local.lock().await.reload();
        if self.is_online() {
            self.pull_if_idle().await?;
        }
        Ok(self.view().await)
    }

    /// React to one connectivity edge.
    ///
    /// Going online flushes automatically when operations are queued.
    pub async fn on_connectivity_changed(&self, online: bool) -> Result<Option<SyncReport>> {
        if !online {
            tracing::info!("Connectivity lost");
            if !self.syncing.load(Ordering::SeqCst) {
                self.state.send_replace(SyncState::Offline);
            }
            return Ok(None);
        }

        tracing::info!("Connectivity restored");
        if !self.syncing.load(Ordering::SeqCst) {
            self.state.send_replace(SyncState::Idle);
        }
        if self.local.lock().await.queue().is_empty() {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    /// Follow the connectivity signal until its sender is dropped
    pub async fn watch_connectivity(&self) {
        let mut receiver = self.connectivity.clone();
        let mut last = *receiver.borrow_and_update();

        while receiver.changed().await.is_ok() {
            let online = *receiver.borrow_and_update();
            if online == last {
                continue;
            }
            last = online;

            match self.on_connectivity_changed(online).await {
                Ok(Some(report)) => {
                    tracing::info!(outcome = ?report.outcome, "Automatic sync finished");
                }
                Ok(None) => {}
                Err(error) => tracing::warn!(%error, "Automatic sync failed"),
            }
        }
        tracing::debug!("Connectivity signal closed");
    }

    pub async fn view(&self) -> DerivedView {
        let local = self.local.lock().await;
        self.derive(&local)
    }

    fn derive(&self, local: &LocalState) -> DerivedView {
        DerivedView {
            batch_totals: local.store().records().batch_totals(),
            pending_operations: local.queue().len(),
            state: self.state(),
            last_sync: local.last_sync().map(str::to_string),
        }
    }

    async fn flush(&self) -> Result<SyncReport> {
        let Some(guard) = self.begin_sync() else {
            tracing::debug!("Sync already in flight");
            return Ok(SyncReport {
                outcome: SyncOutcome::AlreadySyncing,
                view: self.view().await,
            });
        };

        let snapshot = self.local.lock().await.queue().drain();
        let pushed = snapshot.len();
        if !snapshot.is_empty() {
            tracing::info!(operations = pushed, "Pushing pending operations");
            if let Err(error) = self.bounded(self.gateway.push(&snapshot)).await {
                tracing::warn!(%error, "Push failed; operations stay queued");
                return Err(Error::push(error));
            }
            self.local.lock().await.acknowledge(pushed)?;
        }

        let records = self.bounded(self.gateway.pull()).await.map_err(|error| {
            tracing::warn!(%error, "Pull after push failed; keeping local records");
            Error::pull(error)
        })?;
        let pulled = records.collections.len() + records.deductions.len();
        self.local.lock().await.apply_pull(records)?;
        drop(guard);

        tracing::info!(pushed, pulled, "Sync completed");
        Ok(SyncReport {
            outcome: SyncOutcome::Completed { pushed, pulled },
            view: self.view().await,
        })
    }

    /// Pull outside a flush. Skipped while operations are queued or another
    /// sync runs; returns whether a snapshot was applied.
    async fn pull_if_idle(&self) -> Result<bool> {
        let Some(_guard) = self.begin_sync() else {
            return Ok(false);
        };
        if !self.local.lock().await.queue().is_empty() {
            tracing::debug!("Skipping pull with operations queued");
            return Ok(false);
        }

        let records = self
            .bounded(self.gateway.pull())
            .await
            .map_err(Error::pull)?;
        self.local.lock().await.apply_pull(records)?;
        Ok(true)
    }

    fn begin_sync(&self) -> Option<SyncGuard<'_, G>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.state.send_replace(SyncState::Syncing);
        Some(SyncGuard { engine: self })
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> std::result::Result<T, RemoteError> {
        tokio::time::timeout(self.config.request_timeout, request)
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }
}

/// Clears the in-flight flag and settles the state however the sync ends
struct SyncGuard<'a, G> {
    engine: &'a SyncEngine<G>,
}

impl<G> Drop for SyncGuard<'_, G> {
    fn drop(&mut self) {
        let settled = if *self.engine.connectivity.borrow() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        self.engine.syncing.store(false, Ordering::SeqCst);
        self.engine.state.send_replace(settled);
    }
}

//! milkbook-core - Core library for milkbook
//!
//! This crate contains the models, durable local storage, pending operation
//! queue, batch aggregation and the sync engine used by every milkbook front
//! end. Front ends talk to the engine only through [`SyncEngine`].

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use aggregate::{compute_batch_totals, BatchTotal, BatchTotals};
pub use config::{ConfigError, SyncConfig};
pub use db::{MemoryStorage, SqliteStorage, Storage};
pub use error::{Error, Result, SyncStage, ValidationError};
pub use models::{
    AlcoholTest, Batch, CollectionInput, CollectionRecord, Collector, DeductionInput,
    DeductionRecord, IdGenerator, RecordId,
};
pub use remote::{RemoteError, RemoteGateway, SheetsGateway};
pub use state::SyncState;
pub use store::{PendingOperation, RecordSet};
pub use sync::{ConnectivitySignal, DerivedView, SyncEngine, SyncOutcome, SyncReport};

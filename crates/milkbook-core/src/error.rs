//! Error types for milkbook-core

use std::fmt;

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using milkbook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in milkbook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input rejected before any mutation happened
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Collection not found
    #[error("Collection not found: {0}")]
    NotFound(String),

    /// Manual sync requested without connectivity
    #[error("Cannot sync while offline")]
    Offline,

    /// Remote gateway failure during a push or pull
    #[error("Sync {stage} failed: {source}")]
    Remote {
        stage: SyncStage,
        #[source]
        source: RemoteError,
    },
}

impl Error {
    /// Whether retrying the same call later can succeed without user changes.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Offline)
    }

    pub(crate) const fn push(source: RemoteError) -> Self {
        Self::Remote {
            stage: SyncStage::Push,
            source,
        }
    }

    pub(crate) const fn pull(source: RemoteError) -> Self {
        Self::Remote {
            stage: SyncStage::Pull,
            source,
        }
    }
}

/// Which half of the sync protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Push,
    Pull,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
        }
    }
}

/// Input problems detected by the operation API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("quantity is required")]
    MissingQuantity,
    #[error("quantity must be a finite, non-negative number (got {0})")]
    InvalidQuantity(f64),
    #[error("{0} must be a finite number")]
    InvalidMeasurement(&'static str),
    #[error("batch is required")]
    MissingBatch,
    #[error("reason is required")]
    MissingReason,
    #[error("collector must be one of the registered collectors (got {0})")]
    UnknownCollector(String),
    #[error("batch {0} does not exist")]
    UnknownBatch(String),
    #[error("batch {0} is already dispatched")]
    BatchDispatched(String),
}

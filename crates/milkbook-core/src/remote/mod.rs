//! Remote gateway to the spreadsheet-backed service

pub mod decode;
mod sheets;
pub mod wire;

use std::sync::Arc;

use thiserror::Error;

pub use sheets::SheetsGateway;

use crate::store::{PendingOperation, RecordSet};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote request timed out")]
    Timeout,
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("No remote endpoint is configured")]
    NotConfigured,
}

/// Request/response channel to the authoritative store
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    /// Fetch the full authoritative snapshot
    async fn pull(&self) -> Result<RecordSet, RemoteError>;

    /// Apply `operations` in order, all or nothing
    async fn push(&self, operations: &[PendingOperation]) -> Result<(), RemoteError>;
}

/// Local-only mode: without a gateway every call fails as not configured.
impl<G: RemoteGateway> RemoteGateway for Option<G> {
    async fn pull(&self) -> Result<RecordSet, RemoteError> {
        match self {
            Some(gateway) => gateway.pull().await,
            None => Err(RemoteError::NotConfigured),
        }
    }

    async fn push(&self, operations: &[PendingOperation]) -> Result<(), RemoteError> {
        match self {
            Some(gateway) => gateway.push(operations).await,
            None => Err(RemoteError::NotConfigured),
        }
    }
}

impl<G: RemoteGateway> RemoteGateway for Arc<G> {
    async fn pull(&self) -> Result<RecordSet, RemoteError> {
        G::pull(self).await
    }

    async fn push(&self, operations: &[PendingOperation]) -> Result<(), RemoteError> {
        G::push(self, operations).await
    }
}

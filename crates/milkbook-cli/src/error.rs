use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] milkbook_core::Error),
    #[error(transparent)]
    Remote(#[from] milkbook_core::RemoteError),
    #[error(transparent)]
    InvalidConfig(#[from] milkbook_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid arrival time '{0}', expected HH:MM")]
    InvalidArrivalTime(String),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error(
        "Sync is not configured. Run `milkbook config init --endpoint <URL>` or set MILKBOOK_ENDPOINT."
    )]
    SyncNotConfigured,
}

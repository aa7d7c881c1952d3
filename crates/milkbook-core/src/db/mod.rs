//! Local persistence for milkbook

mod connection;
mod migrations;
mod storage;

pub use connection::Database;
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageKey};

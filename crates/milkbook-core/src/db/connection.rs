//! Database connection management

use std::path::Path;

use rusqlite::Connection;

use super::migrations;
use crate::error::{Error, Result};

/// Database wrapper for the local `SQLite` file
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. A file that is not a database is moved
    /// aside and replaced by a fresh one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match Self::open_file(path) {
            Ok(database) => Ok(database),
            Err(error) if is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local database at {} is unreadable: {}. Moving it aside and starting fresh.",
                    path.display(),
                    error
                );
                quarantine_corrupted_db_files(path)?;
                Self::open_file(path)
            }
            Err(error) => Err(error),
        }
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let database = Self {
            conn: Connection::open_in_memory()?,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    fn open_file(path: &Path) -> Result<Self> {
        let database = Self {
            conn: Connection::open(path)?,
        };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` so that a committed write survives a crash
    fn configure(&self) -> Result<()> {
        // In-memory databases report "memory" and keep it
        match self
            .conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get::<_, String>(0))
        {
            Ok(mode) if is_expected_journal_mode(&mode) => {}
            Ok(mode) => tracing::warn!("SQLite kept journal mode {mode} instead of WAL"),
            Err(error) => tracing::warn!("Failed to enable WAL journal mode: {error}"),
        }
        self.conn.execute_batch("PRAGMA synchronous = FULL;")?;
        Ok(())
    }

    /// Journal mode currently in effect
    pub fn journal_mode(&self) -> Result<String> {
        Ok(self
            .conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))?)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn is_expected_journal_mode(mode: &str) -> bool {
    mode.eq_ignore_ascii_case("wal") || mode.eq_ignore_ascii_case("memory")
}

fn is_corrupted_db_error(error: &Error) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    message.contains("file is not a database") || message.contains("malformed")
}

fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
    if db_path.exists() {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let base_name = db_path
            .file_name()
            .map_or_else(|| "milkbook.db".into(), |name| name.to_string_lossy());
        let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

        std::fs::rename(db_path, &backup_path)?;
        tracing::warn!(
            "Moved corrupted local DB file from {} to {}",
            db_path.display(),
            backup_path.display()
        );
    }

    for suffix in ["-wal", "-shm", "-journal"] {
        let mut sidecar = db_path.as_os_str().to_owned();
        sidecar.push(suffix);
        let sidecar = Path::new(&sidecar);
        if sidecar.exists() {
            std::fs::remove_file(sidecar)?;
            tracing::warn!("Removed stale database file {}", sidecar.display());
        }
    }

    Ok(())
}

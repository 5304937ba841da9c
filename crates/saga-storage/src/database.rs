// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management.
//!
//! A [`Database`] wraps exactly one `tokio_rusqlite::Connection`. Every query
//! runs as a closure on that connection's background thread, so all ledger
//! writes are serialized without further locking.

use std::path::Path;

use saga_core::SagaError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Handle to the ledger database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, SagaError> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory().await.map_err(open_err)?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SagaError::Storage {
                        source: Box::new(e),
                    })?;
            }
            Connection::open(path).await.map_err(open_err)?
        };

        let use_wal = wal_mode && path != IN_MEMORY;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if use_wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<Result<(), SagaError>, rusqlite::Error> {
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, wal = use_wal, "ledger database opened");
        Ok(Self { conn })
    }

    /// Opens a fresh in-memory database. Used heavily in tests.
    pub async fn open_in_memory() -> Result<Self, SagaError> {
        Self::open(IN_MEMORY, false).await
    }

    /// The single connection all queries run on.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs a trivial query to prove the connection is alive.
    pub async fn ping(&self) -> Result<(), SagaError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), SagaError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Maps a `tokio_rusqlite` call error into [`SagaError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SagaError {
    SagaError::Storage {
        source: Box::new(e),
    }
}

fn open_err(e: impl std::fmt::Display) -> SagaError {
    SagaError::storage_msg(format!("failed to open database: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_is_migrated() {
        let db = Database::open_in_memory().await.unwrap();
        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for table in ["canonical_stories", "index_jobs", "lore_entries", "story_lines"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}: {tables:?}");
        }
    }

    #[tokio::test]
    async fn file_database_creates_parent_dirs_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("saga.db");
        let path = path.to_string_lossy().into_owned();

        let db = Database::open(&path, true).await.unwrap();
        db.ping().await.unwrap();
        db.checkpoint().await.unwrap();
        drop(db);

        // Second open applies no migrations and still works.
        let db = Database::open(&path, true).await.unwrap();
        db.ping().await.unwrap();
    }
}

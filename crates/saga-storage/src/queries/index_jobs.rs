// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash-safe queue of embedding jobs.
//!
//! A dequeued job is leased until `locked_until`. If the worker dies before
//! acking, the lease expires and the job becomes eligible again, which makes
//! indexing at-least-once.

use std::str::FromStr;

use rusqlite::{OptionalExtension, params};
use saga_core::SagaError;
use saga_core::types::{IndexJob, IndexJobKind};

use crate::database::{Database, map_tr_err};
use crate::queries::decode_err;

/// Enqueues a job. Returns its id.
pub async fn enqueue(
    db: &Database,
    kind: IndexJobKind,
    target_id: i64,
    max_attempts: u32,
) -> Result<i64, SagaError> {
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO index_jobs (kind, target_id, max_attempts) VALUES (?1, ?2, ?3)",
                params![kind, target_id, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Leases the oldest runnable job for `lease_secs` seconds.
///
/// Runnable means pending, or processing with an expired lease.
pub async fn dequeue(db: &Database, lease_secs: u64) -> Result<Option<IndexJob>, SagaError> {
    let lease = format!("+{lease_secs} seconds");
    db.connection()
        .call(move |conn| -> Result<Option<IndexJob>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let job = tx
                .query_row(
                    "SELECT id, kind, target_id, attempts, max_attempts
                     FROM index_jobs
                     WHERE status = 'pending'
                        OR (status = 'processing'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY id ASC
                     LIMIT 1",
                    [],
                    |row| {
                        let kind: String = row.get(1)?;
                        Ok(IndexJob {
                            id: row.get(0)?,
                            kind: IndexJobKind::from_str(&kind).map_err(|e| decode_err(1, e))?,
                            target_id: row.get(2)?,
                            attempts: row.get(3)?,
                            max_attempts: row.get(4)?,
                        })
                    },
                )
                .optional()?;

            if let Some(ref job) = job {
                tx.execute(
                    "UPDATE index_jobs SET status = 'processing',
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![lease, job.id],
                )?;
            }
            tx.commit()?;
            Ok(job)
        })
        .await
        .map_err(map_tr_err)
}

/// Marks a job completed.
pub async fn ack(db: &Database, id: i64) -> Result<(), SagaError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE index_jobs SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Records a failed attempt.
///
/// Returns true when the job went back to pending, false when it has used up
/// its attempts and is now marked failed.
pub async fn fail(db: &Database, id: i64, error: &str) -> Result<bool, SagaError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let (attempts, max_attempts): (i64, i64) = tx.query_row(
                "SELECT attempts, max_attempts FROM index_jobs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let attempts = attempts + 1;
            let retry = attempts < max_attempts;
            tx.execute(
                "UPDATE index_jobs SET status = ?1, attempts = ?2, last_error = ?3,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![if retry { "pending" } else { "failed" }, attempts, error, id],
            )?;
            tx.commit()?;
            Ok(retry)
        })
        .await
        .map_err(map_tr_err)
}

/// Marks a job failed without spending further attempts.
pub async fn abandon(db: &Database, id: i64, error: &str) -> Result<(), SagaError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE index_jobs SET status = 'failed', last_error = ?1,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Jobs that ended in failure.
pub async fn failed_count(db: &Database) -> Result<i64, SagaError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM index_jobs WHERE status = 'failed'",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Jobs that are pending or leased.
pub async fn pending_count(db: &Database) -> Result<i64, SagaError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM index_jobs WHERE status IN ('pending', 'processing')",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical story queries. Stories are immutable once inserted.

use rusqlite::{OptionalExtension, Row, params};
use saga_core::SagaError;
use saga_core::types::{CanonicalStory, NewCanonicalStory};

use crate::database::{Database, map_tr_err};

const STORY_COLUMNS: &str = "id, title, full_text, original_lines_count, canonicalized_by, \
                             version, created_at, finalized_at";

fn row_to_story(row: &Row<'_>) -> Result<CanonicalStory, rusqlite::Error> {
    Ok(CanonicalStory {
        id: row.get(0)?,
        title: row.get(1)?,
        full_text: row.get(2)?,
        original_lines_count: row.get(3)?,
        canonicalized_by: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        finalized_at: row.get(7)?,
    })
}

/// Inserts a finalized story. Each canonicalization is a new top-level record.
pub async fn insert(db: &Database, story: NewCanonicalStory) -> Result<CanonicalStory, SagaError> {
    db.connection()
        .call(move |conn| -> Result<CanonicalStory, rusqlite::Error> {
            conn.execute(
                "INSERT INTO canonical_stories
                    (title, full_text, original_lines_count, canonicalized_by, finalized_at)
                 VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![
                    story.title,
                    story.full_text,
                    story.original_lines_count,
                    story.canonicalized_by
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {STORY_COLUMNS} FROM canonical_stories WHERE id = ?1"),
                params![id],
                row_to_story,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<CanonicalStory>, SagaError> {
    db.connection()
        .call(move |conn| -> Result<Option<CanonicalStory>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {STORY_COLUMNS} FROM canonical_stories WHERE id = ?1"),
                params![id],
                row_to_story,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

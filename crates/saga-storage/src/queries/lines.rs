// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story line queries.
//!
//! Sequence positions are assigned inside the insert transaction as
//! `MAX(line_number) + 1`. Because every call runs on the single writer
//! connection, two appends can never observe the same maximum; the unique
//! index on `line_number` rejects a duplicate outright if that ever changes.

use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use saga_core::SagaError;
use saga_core::types::{NewStoryLine, StoryLine};

use crate::database::{Database, map_tr_err};
use crate::queries::decode_err;

const LINE_COLUMNS: &str = "id, user_id, text, line_number, llm_proposed, user_edited, verified, \
                            signature, context_used, embedding_id, created_at, updated_at";

fn row_to_line(row: &Row<'_>) -> Result<StoryLine, rusqlite::Error> {
    let context_json: String = row.get(8)?;
    let context_used = serde_json::from_str(&context_json).map_err(|e| decode_err(8, e))?;
    Ok(StoryLine {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        line_number: row.get(3)?,
        llm_proposed: row.get(4)?,
        user_edited: row.get(5)?,
        verified: row.get(6)?,
        signature: row.get(7)?,
        context_used,
        embedding_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Appends a line at the next sequence position.
pub async fn append(db: &Database, line: NewStoryLine) -> Result<StoryLine, SagaError> {
    let context_json = serde_json::to_string(&line.context_used)
        .map_err(|e| SagaError::Internal(format!("failed to encode context: {e}")))?;

    db.connection()
        .call(move |conn| -> Result<StoryLine, rusqlite::Error> {
            let tx = conn.transaction()?;
            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(line_number), 0) + 1 FROM story_lines",
                [],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO story_lines
                    (user_id, text, line_number, llm_proposed, user_edited, verified,
                     signature, context_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    line.user_id,
                    line.text,
                    next,
                    line.llm_proposed,
                    line.user_edited,
                    line.verified,
                    line.signature,
                    context_json,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let stored = tx.query_row(
                &format!("SELECT {LINE_COLUMNS} FROM story_lines WHERE id = ?1"),
                params![id],
                row_to_line,
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<StoryLine>, SagaError> {
    db.connection()
        .call(move |conn| -> Result<Option<StoryLine>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LINE_COLUMNS} FROM story_lines WHERE id = ?1"),
                params![id],
                row_to_line,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Marks a line verified in place. Returns `None` for an unknown id.
pub async fn verify(
    db: &Database,
    id: i64,
    signature: &str,
) -> Result<Option<StoryLine>, SagaError> {
    let signature = signature.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<StoryLine>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE story_lines SET verified = 1, signature = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![signature, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {LINE_COLUMNS} FROM story_lines WHERE id = ?1"),
                params![id],
                row_to_line,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_embedding_id(db: &Database, id: i64, embedding_id: &str) -> Result<(), SagaError> {
    let embedding_id = embedding_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE story_lines SET embedding_id = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![embedding_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All lines (or only verified ones) in sequence order.
pub async fn list(db: &Database, verified_only: bool) -> Result<Vec<StoryLine>, SagaError> {
    db.connection()
        .call(move |conn| -> Result<Vec<StoryLine>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LINE_COLUMNS} FROM story_lines
                 WHERE (?1 = 0 OR verified = 1)
                 ORDER BY line_number ASC"
            ))?;
            let rows = stmt.query_map(params![verified_only], row_to_line)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Verified lines in sequence order, optionally restricted to `ids`.
pub async fn verified(db: &Database, ids: Option<Vec<i64>>) -> Result<Vec<StoryLine>, SagaError> {
    db.connection()
        .call(move |conn| -> Result<Vec<StoryLine>, rusqlite::Error> {
            match ids {
                Some(ids) if ids.is_empty() => Ok(Vec::new()),
                Some(ids) => {
                    let placeholders = vec!["?"; ids.len()].join(", ");
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LINE_COLUMNS} FROM story_lines
                         WHERE verified = 1 AND id IN ({placeholders})
                         ORDER BY line_number ASC"
                    ))?;
                    let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_line)?;
                    rows.collect()
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LINE_COLUMNS} FROM story_lines
                         WHERE verified = 1
                         ORDER BY line_number ASC"
                    ))?;
                    let rows = stmt.query_map([], row_to_line)?;
                    rows.collect()
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Lines with the given ids, verified or not, in sequence order.
pub async fn by_ids(db: &Database, ids: Vec<i64>) -> Result<Vec<StoryLine>, SagaError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    db.connection()
        .call(move |conn| -> Result<Vec<StoryLine>, rusqlite::Error> {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {LINE_COLUMNS} FROM story_lines
                 WHERE id IN ({placeholders})
                 ORDER BY line_number ASC"
            ))?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_line)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` verified lines, newest first.
pub async fn recent_verified(db: &Database, limit: usize) -> Result<Vec<StoryLine>, SagaError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<StoryLine>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LINE_COLUMNS} FROM story_lines
                 WHERE verified = 1
                 ORDER BY line_number DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_line)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(text: &str) -> NewStoryLine {
        NewStoryLine {
            user_id: "anonymous".into(),
            text: text.into(),
            verified: true,
            signature: Some("abcd".into()),
            ..Default::default()
        }
    }

    fn draft(text: &str, context: &[&str]) -> NewStoryLine {
        NewStoryLine {
            user_id: "anonymous".into(),
            text: text.into(),
            llm_proposed: Some(text.into()),
            context_used: context.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn append_assigns_consecutive_positions() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..5 {
            let line = append(&db, signed(&format!("line {i}"))).await.unwrap();
            assert_eq!(line.line_number, i + 1);
        }
        let numbers: Vec<i64> = list(&db, false)
            .await
            .unwrap()
            .iter()
            .map(|l| l.line_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn concurrent_appends_never_share_a_position() {
        let db = Database::open_in_memory().await.unwrap();
        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                append(&db, signed(&format!("racer {i}"))).await.unwrap()
            }));
        }
        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().line_number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn draft_round_trips_context() {
        let db = Database::open_in_memory().await.unwrap();
        let stored = append(&db, draft("The dragon roars.", &["A wizard lives in a tower."]))
            .await
            .unwrap();
        assert!(!stored.verified);
        let fetched = get(&db, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.context_used, vec!["A wizard lives in a tower."]);
        assert_eq!(fetched.llm_proposed.as_deref(), Some("The dragon roars."));
    }

    #[tokio::test]
    async fn verify_marks_line_and_unknown_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        let stored = append(&db, draft("Rain fell.", &[])).await.unwrap();

        let verified = verify(&db, stored.id, "user_signed").await.unwrap().unwrap();
        assert!(verified.verified);
        assert_eq!(verified.signature.as_deref(), Some("user_signed"));

        assert!(verify(&db, 9999, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verified_filters_and_orders() {
        let db = Database::open_in_memory().await.unwrap();
        let a = append(&db, signed("a")).await.unwrap();
        let _draft = append(&db, draft("b", &[])).await.unwrap();
        let c = append(&db, signed("c")).await.unwrap();

        let all = verified(&db, None).await.unwrap();
        assert_eq!(all.iter().map(|l| l.id).collect::<Vec<_>>(), vec![a.id, c.id]);

        let only_c = verified(&db, Some(vec![c.id, 12345])).await.unwrap();
        assert_eq!(only_c.len(), 1);
        assert_eq!(only_c[0].text, "c");

        assert!(verified(&db, Some(vec![])).await.unwrap().is_empty());
        assert_eq!(list(&db, true).await.unwrap().len(), 2);
        assert_eq!(list(&db, false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recent_verified_is_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        for text in ["one", "two", "three"] {
            append(&db, signed(text)).await.unwrap();
        }
        let recent = recent_verified(&db, 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(),
            vec!["three", "two"]
        );
    }

    #[tokio::test]
    async fn embedding_id_is_back_filled() {
        let db = Database::open_in_memory().await.unwrap();
        let stored = append(&db, signed("x")).await.unwrap();
        set_embedding_id(&db, stored.id, "story_line_1").await.unwrap();
        let fetched = get(&db, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.embedding_id.as_deref(), Some("story_line_1"));
    }
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lore entry queries. Rows are append-only; names are not deduplicated.

use std::str::FromStr;

use rusqlite::{OptionalExtension, Row, params};
use saga_core::SagaError;
use saga_core::types::{LoreCategory, LoreEntry, NewLoreEntry};

use crate::database::{Database, map_tr_err};
use crate::queries::decode_err;

const LORE_COLUMNS: &str =
    "id, category, name, description, source_line_ids, confidence, embedding_id, created_at";

fn row_to_lore(row: &Row<'_>) -> Result<LoreEntry, rusqlite::Error> {
    let category: String = row.get(1)?;
    let category = LoreCategory::from_str(&category).map_err(|e| decode_err(1, e))?;
    let sources: String = row.get(4)?;
    let source_line_ids = serde_json::from_str(&sources).map_err(|e| decode_err(4, e))?;
    Ok(LoreEntry {
        id: row.get(0)?,
        category,
        name: row.get(2)?,
        description: row.get(3)?,
        source_line_ids,
        confidence: row.get(5)?,
        embedding_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Inserts one lore entry in its own implicit transaction.
pub async fn insert(db: &Database, entry: NewLoreEntry) -> Result<LoreEntry, SagaError> {
    let sources = serde_json::to_string(&entry.source_line_ids)
        .map_err(|e| SagaError::Internal(format!("failed to encode source lines: {e}")))?;
    let category = entry.category.to_string();

    db.connection()
        .call(move |conn| -> Result<LoreEntry, rusqlite::Error> {
            conn.execute(
                "INSERT INTO lore_entries (category, name, description, source_line_ids, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![category, entry.name, entry.description, sources, entry.confidence],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {LORE_COLUMNS} FROM lore_entries WHERE id = ?1"),
                params![id],
                row_to_lore,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: i64) -> Result<Option<LoreEntry>, SagaError> {
    db.connection()
        .call(move |conn| -> Result<Option<LoreEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LORE_COLUMNS} FROM lore_entries WHERE id = ?1"),
                params![id],
                row_to_lore,
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
                "UPDATE lore_entries SET embedding_id = ?1 WHERE id = ?2",
                params![embedding_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Every lore entry in insertion order.
pub async fn list(db: &Database) -> Result<Vec<LoreEntry>, SagaError> {
    db.connection()
        .call(|conn| -> Result<Vec<LoreEntry>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {LORE_COLUMNS} FROM lore_entries ORDER BY id ASC"))?;
            let rows = stmt.query_map([], row_to_lore)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

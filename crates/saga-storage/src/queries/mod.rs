// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs one
//! closure on the single writer connection.

pub mod canonical;
pub mod index_jobs;
pub mod lines;
pub mod lore;

use rusqlite::types::Type;

/// Wraps a decode failure for column `idx` as a rusqlite conversion error.
pub(crate) fn decode_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

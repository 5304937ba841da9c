// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns the signed ledger into one polished narrative.

use std::sync::Arc;

use saga_core::types::{CanonicalStory, NewCanonicalStory};
use saga_core::{SagaError, StorageAdapter};
use saga_memory::StoryWriter;
use tracing::info;

/// Title used when the caller gives none.
pub const DEFAULT_TITLE: &str = "Untitled Story";

pub struct Canonicalizer {
    storage: Arc<dyn StorageAdapter>,
    writer: Arc<StoryWriter>,
}

impl Canonicalizer {
    pub fn new(storage: Arc<dyn StorageAdapter>, writer: Arc<StoryWriter>) -> Self {
        Self { storage, writer }
    }

    /// Canonicalizes verified lines in sequence order, optionally only `line_ids`.
    ///
    /// An empty `line_ids` slice means no restriction. A selection with no
    /// verified lines is [`SagaError::NotFound`] and writes nothing.
    /// Generation errors propagate; the output is stored as returned.
    pub async fn canonicalize(
        &self,
        line_ids: Option<&[i64]>,
        title: Option<&str>,
    ) -> Result<CanonicalStory, SagaError> {
        let line_ids = line_ids.filter(|ids| !ids.is_empty());
        let lines = self.storage.verified_lines(line_ids).await?;
        if lines.is_empty() {
            return Err(SagaError::NotFound("no verified lines to canonicalize".into()));
        }

        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        let full_text = self.writer.canonicalize(&texts).await?;

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);

        let story = self
            .storage
            .insert_canonical(NewCanonicalStory {
                title: title.to_string(),
                full_text,
                original_lines_count: texts.len() as i64,
                canonicalized_by: self.writer.canonicalizer_identity(),
            })
            .await?;

        info!(
            story_id = story.id,
            lines = story.original_lines_count,
            "canonical story created"
        );
        Ok(story)
    }
}

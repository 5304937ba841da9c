// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented suggestion.
//!
//! Retrieval degrades to an empty context on any failure; generation
//! failures propagate.

use std::sync::Arc;

use saga_core::SagaError;
use saga_core::traits::EmbeddingAdapter;
use saga_core::types::{STORY_LINE_CATEGORY, VectorHit};
use saga_vector::VectorIndex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::writer::StoryWriter;

/// A retrieved piece of prior story text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub embedding_id: String,
    pub text: String,
    pub category: String,
    /// `1 / (1 + distance)`, in `(0, 1]`.
    pub score: f32,
}

impl From<VectorHit> for ContextItem {
    fn from(hit: VectorHit) -> Self {
        Self {
            score: relevance_score(hit.distance),
            embedding_id: hit.embedding_id,
            text: hit.text,
            category: hit.category,
        }
    }
}

/// A generated suggestion with the context it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub context: Vec<ContextItem>,
    pub context_count: usize,
}

/// Maps a distance to a relevance score. Negative distances clamp to 0.
pub fn relevance_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Composes retrieval and the suggestion role.
pub struct RagOrchestrator {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingAdapter>,
    writer: Arc<StoryWriter>,
    max_context_lines: usize,
}

impl RagOrchestrator {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingAdapter>,
        writer: Arc<StoryWriter>,
        max_context_lines: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            writer,
            max_context_lines,
        }
    }

    /// Up to `k` context items for `query`, best first.
    ///
    /// Returns an empty list when the store is unavailable or any step fails.
    pub async fn retrieve_context(
        &self,
        query: &str,
        k: usize,
        category: Option<&str>,
    ) -> Vec<ContextItem> {
        if k == 0 || !self.index.is_available() {
            return Vec::new();
        }

        let vector = match self.embedder.embed_one(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed, continuing without context");
                return Vec::new();
            }
        };

        match self.index.search(&vector, k, category).await {
            Ok(hits) => {
                let mut items: Vec<ContextItem> =
                    hits.into_iter().take(k).map(ContextItem::from).collect();
                items.sort_by(|a, b| b.score.total_cmp(&a.score));
                debug!(count = items.len(), "context retrieved");
                items
            }
            Err(e) => {
                warn!(error = %e, "context search failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Suggests the next line for `prompt`, grounded on prior story lines.
    pub async fn generate_with_context(&self, prompt: &str) -> Result<Suggestion, SagaError> {
        let context = self
            .retrieve_context(prompt, self.max_context_lines, Some(STORY_LINE_CATEGORY))
            .await;
        let texts: Vec<String> = context.iter().map(|c| c.text.clone()).collect();
        let text = self.writer.suggest(prompt, &texts).await?;

        Ok(Suggestion {
            text,
            context_count: context.len(),
            context,
        })
    }
}

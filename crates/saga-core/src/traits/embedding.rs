// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait.

use async_trait::async_trait;

use crate::error::SagaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Converts text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Embeds every input text. Output order matches input order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, SagaError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, SagaError> {
        let output = self
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SagaError::Embedding("embedder returned no vectors".into()))
    }
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embeddings, generation roles, and retrieval for Saga.
//!
//! - [`OnnxEmbedder`] turns text into vectors locally.
//! - [`StoryWriter`] runs the suggestion, lore, summary, and canonical roles.
//! - [`RagOrchestrator`] grounds suggestions on retrieved story lines.

pub mod embedder;
pub mod lore;
pub mod model_manager;
pub mod rag;
pub mod writer;

use saga_config::model::EmbeddingConfig;
use saga_core::SagaError;

pub use embedder::OnnxEmbedder;
pub use lore::{LoreItem, LoreSet, parse_lore};
pub use model_manager::ModelManager;
pub use rag::{ContextItem, RagOrchestrator, Suggestion, relevance_score};
pub use writer::{GenerationRole, StoryWriter};

/// Ensures the configured model is cached, then loads it.
pub async fn load_embedder(config: &EmbeddingConfig) -> Result<OnnxEmbedder, SagaError> {
    let model_path = ModelManager::from_config(config).ensure_model().await?;
    OnnxEmbedder::new(&model_path, config.dimensions)
}

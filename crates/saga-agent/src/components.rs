// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared dependencies every service and worker is built from.

use std::sync::Arc;

use saga_core::{EmbeddingAdapter, StorageAdapter};
use saga_memory::StoryWriter;
use saga_vector::VectorIndex;
use tokio::sync::Notify;

/// Explicitly constructed handles passed to the story service, the indexer,
/// and the consolidator.
#[derive(Clone)]
pub struct StoryComponents {
    pub storage: Arc<dyn StorageAdapter>,
    pub index: Arc<VectorIndex>,
    pub embedder: Arc<dyn EmbeddingAdapter>,
    pub writer: Arc<StoryWriter>,
    /// Wakes the indexer after a job is enqueued.
    pub index_signal: Arc<Notify>,
}

impl StoryComponents {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingAdapter>,
        writer: Arc<StoryWriter>,
    ) -> Self {
        Self {
            storage,
            index,
            embedder,
            writer,
            index_signal: Arc::new(Notify::new()),
        }
    }
}

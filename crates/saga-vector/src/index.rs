// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vector index handle shared by request handlers and background jobs.
//!
//! [`VectorIndex::connect`] tries Milvus within the configured timeout and
//! falls back to the in-memory store on any failure. Callers only see
//! [`VectorHit`]s; which backend served them is reported for health only.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use saga_config::model::VectorStoreConfig;
use saga_core::types::{VectorBackend, VectorHit, VectorRecord};
use saga_core::{SagaError, VectorStore};
use tracing::{info, warn};

use crate::memory::InMemoryStore;
use crate::milvus::MilvusStore;

type Backend = Box<dyn VectorStore>;

/// Swappable handle to the active vector backend.
pub struct VectorIndex {
    config: VectorStoreConfig,
    dimensions: usize,
    active: ArcSwapOption<Backend>,
}

impl VectorIndex {
    /// Creates a disconnected index.
    pub fn new(config: VectorStoreConfig, dimensions: usize) -> Self {
        Self {
            config,
            dimensions,
            active: ArcSwapOption::empty(),
        }
    }

    /// An index already serving from the in-memory store.
    pub fn in_memory(dimensions: usize) -> Self {
        let index = Self::new(
            VectorStoreConfig {
                enabled: false,
                ..VectorStoreConfig::default()
            },
            dimensions,
        );
        index.install(Box::new(InMemoryStore::new(dimensions)));
        index
    }

    /// An index serving from an arbitrary backend.
    pub fn with_store(store: Box<dyn VectorStore>, dimensions: usize) -> Self {
        let index = Self::new(VectorStoreConfig::default(), dimensions);
        index.install(store);
        index
    }

    fn install(&self, store: Backend) {
        self.active.store(Some(Arc::new(store)));
    }

    /// Connects to the primary backend, falling back to memory on failure.
    ///
    /// Never fails. Returns true if the primary backend is serving, false if
    /// the in-memory fallback is.
    pub async fn connect(&self) -> bool {
        if self.config.enabled {
            let timeout = Duration::from_secs(self.config.connect_timeout_secs);
            match tokio::time::timeout(timeout, MilvusStore::connect(&self.config, self.dimensions))
                .await
            {
                Ok(Ok(store)) => {
                    self.install(Box::new(store));
                    return true;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "vector store unavailable, using in-memory fallback");
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.connect_timeout_secs,
                        "vector store connect timed out, using in-memory fallback"
                    );
                }
            }
        } else {
            info!("vector store disabled, using in-memory index");
        }
        self.install(Box::new(InMemoryStore::new(self.dimensions)));
        false
    }

    /// Drops the active backend. Later calls behave as unavailable.
    pub async fn disconnect(&self) {
        if let Some(store) = self.active.swap(None)
            && let Err(e) = store.shutdown().await
        {
            warn!(error = %e, "vector store shutdown failed");
        }
    }

    pub fn is_available(&self) -> bool {
        self.active.load().is_some()
    }

    /// The backend currently serving, if any.
    pub fn backend(&self) -> Option<VectorBackend> {
        self.active.load_full().map(|store| store.backend())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn current(&self) -> Result<Arc<Backend>, SagaError> {
        self.active
            .load_full()
            .ok_or_else(|| SagaError::vector("vector store is not connected"))
    }

    /// Inserts or replaces a record. Returns false (after logging) on failure.
    pub async fn insert(&self, embedding_id: &str, text: &str, vector: Vec<f32>, category: &str) -> bool {
        match self.try_insert(embedding_id, text, vector, category).await {
            Ok(()) => true,
            Err(e) => {
                warn!(embedding_id, error = %e, "vector insert failed");
                false
            }
        }
    }

    /// Like [`insert`](Self::insert) but surfaces the error, for retrying callers.
    pub async fn try_insert(
        &self,
        embedding_id: &str,
        text: &str,
        vector: Vec<f32>,
        category: &str,
    ) -> Result<(), SagaError> {
        let store = self.current()?;
        store
            .upsert(VectorRecord {
                embedding_id: embedding_id.to_string(),
                text: text.to_string(),
                category: category.to_string(),
                vector,
            })
            .await
    }

    /// Up to `k` hits ordered by ascending distance.
    pub async fn search(
        &self,
        query: &[f32],
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<VectorHit>, SagaError> {
        let store = self.current()?;
        store.search(query, k, category).await
    }

    pub async fn count(&self, category: Option<&str>) -> Result<usize, SagaError> {
        let store = self.current()?;
        store.count(category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_falls_back_to_memory() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let index = VectorIndex::new(
            VectorStoreConfig {
                host: "127.0.0.1".into(),
                port: 9,
                connect_timeout_secs: 1,
                ..VectorStoreConfig::default()
            },
            2,
        );
        assert!(!index.is_available());
        assert!(!index.connect().await);
        assert!(index.is_available());
        assert_eq!(index.backend(), Some(VectorBackend::Memory));

        assert!(index.insert("story_line_1", "hello", vec![1.0, 0.0], "story_line").await);
        let hits = index.search(&[1.0, 0.0], 5, Some("story_line")).await.unwrap();
        assert_eq!(hits[0].embedding_id, "story_line_1");
    }

    #[tokio::test]
    async fn disabled_config_skips_server() {
        let index = VectorIndex::new(
            VectorStoreConfig {
                enabled: false,
                ..VectorStoreConfig::default()
            },
            2,
        );
        assert!(!index.connect().await);
        assert_eq!(index.backend(), Some(VectorBackend::Memory));
    }

    #[tokio::test]
    async fn disconnected_index_is_unavailable() {
        let index = VectorIndex::in_memory(2);
        assert!(index.is_available());
        index.disconnect().await;

        assert!(!index.is_available());
        assert!(index.backend().is_none());
        assert!(!index.insert("x", "x", vec![1.0, 0.0], "story_line").await);
        assert!(index.search(&[1.0, 0.0], 1, None).await.is_err());
    }
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A full story stack over a temp SQLite ledger, the in-memory vector
//! index, and mock generation and embedding adapters.

use std::sync::Arc;

use saga_agent::{Consolidator, Indexer, IndexerStats, StoryComponents, StoryService};
use saga_config::SagaConfig;
use saga_config::model::{ConsolidatorConfig, StorageConfig, VectorStoreConfig};
use saga_core::types::StoryLine;
use saga_core::{SagaError, StorageAdapter};
use saga_memory::StoryWriter;
use saga_storage::SqliteStorage;
use saga_vector::VectorIndex;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Model name the harness writer reports.
pub const MOCK_MODEL: &str = "mock-model";

/// Vector width used by the harness embedder.
pub const HARNESS_DIMENSIONS: usize = 64;

pub struct TestHarnessBuilder {
    responses: Vec<String>,
    consolidator: ConsolidatorConfig,
    vector_store: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            consolidator: ConsolidatorConfig::default(),
            vector_store: true,
        }
    }

    /// Queues provider responses, consumed in call order.
    pub fn with_mock_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses = responses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_consolidator(mut self, config: ConsolidatorConfig) -> Self {
        self.consolidator = config;
        self
    }

    /// Leaves the vector index disconnected, as if no backend were reachable.
    pub fn without_vector_store(mut self) -> Self {
        self.vector_store = false;
        self
    }

    pub async fn build(self) -> Result<TestHarness, SagaError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SagaError::Storage { source: e.into() })?;

        let config = SagaConfig {
            storage: StorageConfig {
                database_path: temp_dir.path().join("saga.db").to_string_lossy().into_owned(),
                wal_mode: true,
            },
            consolidator: self.consolidator,
            ..SagaConfig::default()
        };

        let storage = SqliteStorage::new(config.storage.clone()).with_queue_policy(&config.indexer);
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let index = Arc::new(if self.vector_store {
            VectorIndex::in_memory(HARNESS_DIMENSIONS)
        } else {
            VectorIndex::new(
                VectorStoreConfig {
                    enabled: false,
                    ..VectorStoreConfig::default()
                },
                HARNESS_DIMENSIONS,
            )
        });

        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let embedder = Arc::new(MockEmbedder::new(HARNESS_DIMENSIONS));
        let writer = Arc::new(StoryWriter::new(provider.clone(), MOCK_MODEL));

        let components = StoryComponents::new(storage.clone(), index.clone(), embedder.clone(), writer);
        let service = StoryService::new(components.clone(), &config.rag);
        let indexer = Indexer::new(components.clone(), &config.indexer);
        let consolidator = Consolidator::new(components.clone(), config.consolidator.clone());

        Ok(TestHarness {
            provider,
            embedder,
            storage,
            index,
            components,
            service,
            indexer,
            consolidator,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// Assembled test environment. The temp database lives as long as this value.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub storage: Arc<dyn StorageAdapter>,
    pub index: Arc<VectorIndex>,
    pub components: StoryComponents,
    pub service: StoryService,
    pub indexer: Indexer,
    pub consolidator: Consolidator,
    pub config: SagaConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Signs `text` as a fresh line with no proposal and indexes it.
    pub async fn sign_and_index(&self, text: &str) -> Result<StoryLine, SagaError> {
        let signed = self.service.edit_and_sign(None, text, "tester").await?;
        self.drain_index_queue().await?;
        Ok(signed.line)
    }

    pub async fn drain_index_queue(&self) -> Result<IndexerStats, SagaError> {
        self.indexer.run_pending().await
    }
}

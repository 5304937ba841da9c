// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`StorageAdapter`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use saga_config::model::{IndexerConfig, StorageConfig};
use saga_core::types::{
    CanonicalStory, IndexJob, IndexJobKind, LoreEntry, NewCanonicalStory, NewLoreEntry,
    NewStoryLine, StoryLine,
};
use saga_core::{AdapterType, HealthStatus, PluginAdapter, SagaError, StorageAdapter};

use crate::database::Database;
use crate::queries::{canonical, index_jobs, lines, lore};

/// SQLite-backed ledger.
///
/// The database is opened lazily by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    max_attempts: u32,
    lease_secs: u64,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        let queue = IndexerConfig::default();
        Self {
            config,
            max_attempts: queue.max_attempts,
            lease_secs: queue.lease_secs,
            db: OnceCell::new(),
        }
    }

    /// Applies the retry budget and lease length used by the job queue.
    pub fn with_queue_policy(mut self, indexer: &IndexerConfig) -> Self {
        self.max_attempts = indexer.max_attempts;
        self.lease_secs = indexer.lease_secs;
        self
    }

    /// Builds and initializes a private in-memory ledger.
    pub async fn in_memory() -> Result<Self, SagaError> {
        let storage = Self::new(StorageConfig {
            database_path: crate::database::IN_MEMORY.to_string(),
            wal_mode: false,
        });
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, SagaError> {
        self.db
            .get()
            .ok_or_else(|| SagaError::storage_msg("storage not initialized, call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        match self.db() {
            Ok(db) => match db.ping().await {
                Ok(()) => Ok(HealthStatus::Healthy),
                Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
            },
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        self.close().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SagaError> {
        self.db
            .get_or_try_init(|| Database::open(&self.config.database_path, self.config.wal_mode))
            .await?;
        debug!(path = %self.config.database_path, "sqlite ledger initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SagaError> {
        if let Some(db) = self.db.get()
            && self.config.wal_mode
        {
            db.checkpoint().await?;
            debug!("sqlite ledger checkpointed");
        }
        Ok(())
    }

    async fn append_line(&self, line: NewStoryLine) -> Result<StoryLine, SagaError> {
        lines::append(self.db()?, line).await
    }

    async fn get_line(&self, id: i64) -> Result<Option<StoryLine>, SagaError> {
        lines::get(self.db()?, id).await
    }

    async fn verify_line(
        &self,
        id: i64,
        signature: &str,
    ) -> Result<Option<StoryLine>, SagaError> {
        lines::verify(self.db()?, id, signature).await
    }

    async fn set_line_embedding(&self, id: i64, embedding_id: &str) -> Result<(), SagaError> {
        lines::set_embedding_id(self.db()?, id, embedding_id).await
    }

    async fn list_lines(&self, verified_only: bool) -> Result<Vec<StoryLine>, SagaError> {
        lines::list(self.db()?, verified_only).await
    }

    async fn verified_lines(&self, ids: Option<&[i64]>) -> Result<Vec<StoryLine>, SagaError> {
        lines::verified(self.db()?, ids.map(<[i64]>::to_vec)).await
    }

    async fn lines_by_ids(&self, ids: &[i64]) -> Result<Vec<StoryLine>, SagaError> {
        lines::by_ids(self.db()?, ids.to_vec()).await
    }

    async fn recent_verified_lines(&self, limit: usize) -> Result<Vec<StoryLine>, SagaError> {
        lines::recent_verified(self.db()?, limit).await
    }

    async fn insert_lore(&self, entry: NewLoreEntry) -> Result<LoreEntry, SagaError> {
        lore::insert(self.db()?, entry).await
    }

    async fn get_lore(&self, id: i64) -> Result<Option<LoreEntry>, SagaError> {
        lore::get(self.db()?, id).await
    }

    async fn set_lore_embedding(&self, id: i64, embedding_id: &str) -> Result<(), SagaError> {
        lore::set_embedding_id(self.db()?, id, embedding_id).await
    }

    async fn list_lore(&self) -> Result<Vec<LoreEntry>, SagaError> {
        lore::list(self.db()?).await
    }

    async fn insert_canonical(
        &self,
        story: NewCanonicalStory,
    ) -> Result<CanonicalStory, SagaError> {
        canonical::insert(self.db()?, story).await
    }

    async fn get_canonical(&self, id: i64) -> Result<Option<CanonicalStory>, SagaError> {
        canonical::get(self.db()?, id).await
    }

    async fn enqueue_index_job(
        &self,
        kind: IndexJobKind,
        target_id: i64,
    ) -> Result<i64, SagaError> {
        index_jobs::enqueue(self.db()?, kind, target_id, self.max_attempts).await
    }

    async fn dequeue_index_job(&self) -> Result<Option<IndexJob>, SagaError> {
        index_jobs::dequeue(self.db()?, self.lease_secs).await
    }

    async fn ack_index_job(&self, id: i64) -> Result<(), SagaError> {
        index_jobs::ack(self.db()?, id).await
    }

    async fn fail_index_job(&self, id: i64, error: &str) -> Result<bool, SagaError> {
        index_jobs::fail(self.db()?, id, error).await
    }

    async fn abandon_index_job(&self, id: i64, error: &str) -> Result<(), SagaError> {
        index_jobs::abandon(self.db()?, id, error).await
    }

    async fn failed_index_jobs(&self) -> Result<i64, SagaError> {
        index_jobs::failed_count(self.db()?).await
    }

    async fn pending_index_jobs(&self) -> Result<i64, SagaError> {
        index_jobs::pending_count(self.db()?).await
    }
}

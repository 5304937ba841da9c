// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background worker that embeds queued lines and lore into the vector store.
//!
//! Jobs live in the ledger's `index_jobs` table, so work enqueued just
//! before a crash is picked up on restart. Each job is embedded, upserted
//! under its deterministic id, back-filled onto the row, and acked.

use std::sync::Arc;
use std::time::Duration;

use saga_config::model::IndexerConfig;
use saga_core::types::{IndexJob, IndexJobKind, STORY_LINE_CATEGORY, story_line_embedding_id};
use saga_core::{EmbeddingAdapter, SagaError, StorageAdapter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::components::StoryComponents;

/// What happened to one dequeued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Indexed,
    /// Failed; the job is pending again.
    Retrying,
    /// Failed for the last time, or its target row is gone.
    Dropped,
}

/// Counters for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexerStats {
    pub indexed: usize,
    pub retrying: usize,
    pub dropped: usize,
}

/// A resolved job target: what to embed and where to put it.
struct Target {
    embedding_id: String,
    text: String,
    category: String,
}

pub struct Indexer {
    components: StoryComponents,
    poll_interval: Duration,
}

impl Indexer {
    pub fn new(components: StoryComponents, config: &IndexerConfig) -> Self {
        Self {
            components,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }

    fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.components.storage
    }

    /// Drains the queue.
    ///
    /// A retryable failure ends the pass so the job is tried again on the
    /// next wake-up instead of burning its attempts back to back.
    pub async fn run_pending(&self) -> Result<IndexerStats, SagaError> {
        let mut stats = IndexerStats::default();
        while let Some(job) = self.storage().dequeue_index_job().await? {
            match self.process(&job).await? {
                JobOutcome::Indexed => stats.indexed += 1,
                JobOutcome::Dropped => stats.dropped += 1,
                JobOutcome::Retrying => {
                    stats.retrying += 1;
                    break;
                }
            }
        }
        if stats != IndexerStats::default() {
            debug!(?stats, "index pass complete");
        }
        Ok(stats)
    }

    async fn process(&self, job: &IndexJob) -> Result<JobOutcome, SagaError> {
        let target = match self.resolve(job).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                warn!(job_id = job.id, kind = %job.kind, target_id = job.target_id, "index target no longer exists, dropping job");
                self.storage()
                    .abandon_index_job(job.id, "index target no longer exists")
                    .await?;
                return Ok(JobOutcome::Dropped);
            }
            Err(e) => return self.record_failure(job, &e).await,
        };

        match self.index(job, &target).await {
            Ok(()) => {
                self.storage().ack_index_job(job.id).await?;
                debug!(job_id = job.id, embedding_id = target.embedding_id, "indexed");
                Ok(JobOutcome::Indexed)
            }
            Err(e) => self.record_failure(job, &e).await,
        }
    }

    async fn resolve(&self, job: &IndexJob) -> Result<Option<Target>, SagaError> {
        Ok(match job.kind {
            IndexJobKind::StoryLine => {
                self.storage()
                    .get_line(job.target_id)
                    .await?
                    .map(|line| Target {
                        embedding_id: story_line_embedding_id(line.id),
                        text: line.text,
                        category: STORY_LINE_CATEGORY.to_string(),
                    })
            }
            IndexJobKind::LoreEntry => {
                self.storage()
                    .get_lore(job.target_id)
                    .await?
                    .map(|entry| Target {
                        embedding_id: entry.category.embedding_id(entry.id),
                        text: entry.embedding_text(),
                        category: entry.category.vector_category(),
                    })
            }
        })
    }

    async fn index(&self, job: &IndexJob, target: &Target) -> Result<(), SagaError> {
        let vector = self.components.embedder.embed_one(&target.text).await?;
        self.components
            .index
            .try_insert(&target.embedding_id, &target.text, vector, &target.category)
            .await?;

        match job.kind {
            IndexJobKind::StoryLine => {
                self.storage()
                    .set_line_embedding(job.target_id, &target.embedding_id)
                    .await
            }
            IndexJobKind::LoreEntry => {
                self.storage()
                    .set_lore_embedding(job.target_id, &target.embedding_id)
                    .await
            }
        }
    }

    async fn record_failure(&self, job: &IndexJob, error: &SagaError) -> Result<JobOutcome, SagaError> {
        let retry = error.is_retryable()
            && self
                .storage()
                .fail_index_job(job.id, &error.to_string())
                .await?;

        if retry {
            warn!(job_id = job.id, attempt = job.attempts + 1, error = %error, "indexing failed, will retry (non-fatal)");
            Ok(JobOutcome::Retrying)
        } else {
            if !error.is_retryable() {
                self.storage()
                    .abandon_index_job(job.id, &error.to_string())
                    .await?;
            }
            warn!(job_id = job.id, kind = %job.kind, target_id = job.target_id, error = %error, "indexing failed permanently, dropping job");
            Ok(JobOutcome::Dropped)
        }
    }

    /// Runs drain passes on every enqueue signal and every poll interval
    /// until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(poll_secs = self.poll_interval.as_secs(), "indexer started");
            let signal = self.components.index_signal.clone();
            loop {
                if let Err(e) = self.run_pending().await {
                    warn!(error = %e, "index pass failed (non-fatal)");
                }
                tokio::select! {
                    _ = signal.notified() => {}
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = cancel.cancelled() => {
                        info!("indexer shutting down");
                        break;
                    }
                }
            }
        })
    }
}

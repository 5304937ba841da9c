// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic lore extraction and rolling summaries.
//!
//! The two jobs share nothing and run on independent timers. Each run
//! completes before its own next tick, and every failure is logged inside
//! the job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use saga_config::model::ConsolidatorConfig;
use saga_core::types::{
    IndexJobKind, LoreCategory, NewLoreEntry, SUMMARY_CATEGORY, summary_embedding_id,
};
use saga_core::{EmbeddingAdapter, SagaError, StorageAdapter};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::components::StoryComponents;
use crate::service::EXTRACTED_LORE_CONFIDENCE;

/// Result of one lore job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoreRun {
    pub lines_read: usize,
    pub entries_stored: usize,
    /// Entries whose embedding was deferred to the indexer.
    pub entries_deferred: usize,
}

/// Result of one summary job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryRun {
    pub lines_read: usize,
    pub chunks_indexed: usize,
    pub chunks_failed: usize,
    pub skipped: bool,
}

pub struct Consolidator {
    components: StoryComponents,
    config: ConsolidatorConfig,
}

impl Consolidator {
    pub fn new(components: StoryComponents, config: ConsolidatorConfig) -> Self {
        Self { components, config }
    }

    /// Extracts lore from the newest verified lines.
    ///
    /// Each entity is stored and embedded on its own; a failure partway
    /// through keeps what was already stored. An entity whose embedding
    /// fails is handed to the indexer queue.
    pub async fn run_lore_job(&self) -> Result<LoreRun, SagaError> {
        let storage = &self.components.storage;
        let lines = storage
            .recent_verified_lines(self.config.lore_batch_size)
            .await?;
        if lines.is_empty() {
            debug!("lore job: no verified lines");
            return Ok(LoreRun::default());
        }

        let source_ids: Vec<i64> = lines.iter().map(|l| l.id).collect();
        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        let lore = self.components.writer.extract_lore(&texts).await;

        let mut run = LoreRun {
            lines_read: texts.len(),
            ..LoreRun::default()
        };

        for (category, item) in lore.iter() {
            let entry = match storage
                .insert_lore(NewLoreEntry {
                    category,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    source_line_ids: source_ids.clone(),
                    confidence: EXTRACTED_LORE_CONFIDENCE,
                })
                .await
            {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(%category, name = item.name, error = %e, "failed to store lore entry (non-fatal)");
                    continue;
                }
            };
            run.entries_stored += 1;

            if let Err(e) = self
                .embed_lore(entry.id, category, &entry.embedding_text())
                .await
            {
                warn!(lore_id = entry.id, error = %e, "lore embedding failed, deferring to indexer");
                run.entries_deferred += 1;
                match storage.enqueue_index_job(IndexJobKind::LoreEntry, entry.id).await {
                    Ok(_) => self.components.index_signal.notify_one(),
                    Err(e) => warn!(lore_id = entry.id, error = %e, "failed to queue lore embedding (non-fatal)"),
                }
            }
        }

        info!(
            lines = run.lines_read,
            stored = run.entries_stored,
            deferred = run.entries_deferred,
            "lore job complete"
        );
        Ok(run)
    }

    async fn embed_lore(
        &self,
        lore_id: i64,
        category: LoreCategory,
        text: &str,
    ) -> Result<(), SagaError> {
        let embedding_id = category.embedding_id(lore_id);
        let vector = self.components.embedder.embed_one(text).await?;
        self.components
            .index
            .try_insert(&embedding_id, text, vector, &category.vector_category())
            .await?;
        self.components
            .storage
            .set_lore_embedding(lore_id, &embedding_id)
            .await
    }

    /// Re-summarizes every chunk of verified lines and upserts the results.
    ///
    /// Skipped when fewer than `summary_min_lines` verified lines exist.
    /// Chunk ids are deterministic, so reruns replace rather than duplicate.
    pub async fn run_summary_job(&self) -> Result<SummaryRun, SagaError> {
        let lines = self.components.storage.verified_lines(None).await?;
        if lines.len() < self.config.summary_min_lines {
            debug!(
                lines = lines.len(),
                min = self.config.summary_min_lines,
                "summary job: not enough lines"
            );
            return Ok(SummaryRun {
                lines_read: lines.len(),
                skipped: true,
                ..SummaryRun::default()
            });
        }

        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        let mut run = SummaryRun {
            lines_read: texts.len(),
            ..SummaryRun::default()
        };

        let chunk_size = self.config.summary_chunk_size.max(1);
        for (i, chunk) in texts.chunks(chunk_size).enumerate() {
            let start = i * chunk_size;
            let end = start + chunk.len();
            match self.summarize_chunk(chunk, start, end).await {
                Ok(()) => run.chunks_indexed += 1,
                Err(e) => {
                    run.chunks_failed += 1;
                    warn!(start, end, error = %e, "summary chunk failed (non-fatal)");
                }
            }
        }

        info!(
            lines = run.lines_read,
            chunks = run.chunks_indexed,
            failed = run.chunks_failed,
            "summary job complete"
        );
        Ok(run)
    }

    async fn summarize_chunk(&self, chunk: &[String], start: usize, end: usize) -> Result<(), SagaError> {
        let summary = self.components.writer.summarize(chunk).await?;
        let vector = self.components.embedder.embed_one(&summary).await?;
        self.components
            .index
            .try_insert(&summary_embedding_id(start, end), &summary, vector, SUMMARY_CATEGORY)
            .await
    }

    /// Starts both job loops. Each exits when `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let lore_every = Duration::from_secs(self.config.lore_interval_secs);
        let summary_every = Duration::from_secs(self.config.summary_interval_secs);

        let lore = {
            let this = self.clone();
            spawn_periodic("lore", lore_every, cancel.clone(), move || {
                let this = this.clone();
                async move { this.run_lore_job().await.map(|_| ()) }
            })
        };
        let summary = {
            let this = self;
            spawn_periodic("summary", summary_every, cancel, move || {
                let this = this.clone();
                async move { this.run_summary_job().await.map(|_| ()) }
            })
        };
        vec![lore, summary]
    }
}

/// Runs `job` every `every`, skipping the immediate first tick.
///
/// The next tick waits for the current run, so a job never overlaps itself.
fn spawn_periodic<F, Fut>(
    name: &'static str,
    every: Duration,
    cancel: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), SagaError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;
        info!(job = name, every_secs = every.as_secs(), "consolidation job scheduled");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tokio::select! {
                        result = job() => {
                            if let Err(e) = result {
                                warn!(job = name, error = %e, "consolidation job failed (non-fatal)");
                            }
                        }
                        _ = cancel.cancelled() => {
                            info!(job = name, "consolidation job cancelled mid-run");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!(job = name, "consolidation job shutting down");
                    break;
                }
            }
        }
    })
}

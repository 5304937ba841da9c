// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the story ledger.

use async_trait::async_trait;

use crate::error::SagaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CanonicalStory, IndexJob, IndexJobKind, LoreEntry, NewCanonicalStory, NewLoreEntry,
    NewStoryLine, StoryLine,
};

/// Persistence for story lines, lore, canonical stories, and the
/// embedding job queue.
///
/// Each method is one logical unit of work committed on its own.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), SagaError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), SagaError>;

    // --- Story lines ---

    /// Appends a line at the next sequence position and returns it.
    async fn append_line(&self, line: NewStoryLine) -> Result<StoryLine, SagaError>;

    async fn get_line(&self, id: i64) -> Result<Option<StoryLine>, SagaError>;

    /// Marks an existing line verified with the given signature.
    /// Returns `None` when the line does not exist.
    async fn verify_line(&self, id: i64, signature: &str)
    -> Result<Option<StoryLine>, SagaError>;

    /// Back-fills the vector store reference of a line.
    async fn set_line_embedding(&self, id: i64, embedding_id: &str) -> Result<(), SagaError>;

    /// All lines ordered by sequence position.
    async fn list_lines(&self, verified_only: bool) -> Result<Vec<StoryLine>, SagaError>;

    /// Verified lines ordered by sequence position, optionally restricted to `ids`.
    async fn verified_lines(&self, ids: Option<&[i64]>) -> Result<Vec<StoryLine>, SagaError>;

    /// Lines with the given ids, drafts included, ordered by sequence position.
    async fn lines_by_ids(&self, ids: &[i64]) -> Result<Vec<StoryLine>, SagaError>;

    /// The newest `limit` verified lines, newest first.
    async fn recent_verified_lines(&self, limit: usize) -> Result<Vec<StoryLine>, SagaError>;

    // --- Lore ---

    async fn insert_lore(&self, entry: NewLoreEntry) -> Result<LoreEntry, SagaError>;

    async fn get_lore(&self, id: i64) -> Result<Option<LoreEntry>, SagaError>;

    async fn set_lore_embedding(&self, id: i64, embedding_id: &str) -> Result<(), SagaError>;

    /// Every lore entry in insertion order.
    async fn list_lore(&self) -> Result<Vec<LoreEntry>, SagaError>;

    // --- Canonical stories ---

    async fn insert_canonical(&self, story: NewCanonicalStory)
    -> Result<CanonicalStory, SagaError>;

    async fn get_canonical(&self, id: i64) -> Result<Option<CanonicalStory>, SagaError>;

    // --- Embedding job queue ---

    /// Enqueues an embedding job and returns its id.
    async fn enqueue_index_job(&self, kind: IndexJobKind, target_id: i64)
    -> Result<i64, SagaError>;

    /// Leases the oldest pending job, if any.
    async fn dequeue_index_job(&self) -> Result<Option<IndexJob>, SagaError>;

    /// Marks a job completed.
    async fn ack_index_job(&self, id: i64) -> Result<(), SagaError>;

    /// Records a failed attempt. Returns true if the job will be retried.
    async fn fail_index_job(&self, id: i64, error: &str) -> Result<bool, SagaError>;

    /// Marks a job failed immediately, for errors retrying cannot fix.
    async fn abandon_index_job(&self, id: i64, error: &str) -> Result<(), SagaError>;

    /// Number of jobs that ended in failure.
    async fn failed_index_jobs(&self) -> Result<i64, SagaError>;

    /// Number of jobs still waiting to run.
    async fn pending_index_jobs(&self) -> Result<i64, SagaError>;
}

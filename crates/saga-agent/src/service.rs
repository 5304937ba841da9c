// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interactive story operations behind the HTTP surface.
//!
//! Drafts and signed lines are separate ledger rows. Embedding of signed
//! lines and extracted lore is queued for the indexer rather than done on
//! the request path.

use saga_config::model::RagConfig;
use saga_core::types::{
    CanonicalStory, HealthStatus, IndexJobKind, LoreCategory, LoreEntry, NewLoreEntry,
    NewStoryLine, StoryLine, VectorBackend, story_line_embedding_id,
};
use saga_core::{PluginAdapter, SagaError, StorageAdapter};
use saga_memory::{ContextItem, LoreSet, RagOrchestrator};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::canonicalizer::Canonicalizer;
use crate::components::StoryComponents;

/// Confidence recorded for model-extracted lore.
pub const EXTRACTED_LORE_CONFIDENCE: f64 = 0.8;

/// Signature stored by the verify path when the caller supplies none.
pub const DEFAULT_SIGNATURE: &str = "user_signed";

/// Hex characters kept from the SHA-256 digest of a signed line.
const SIGNATURE_LEN: usize = 16;

/// Short content digest stored as a signed line's signature.
pub fn line_signature(text: &str) -> String {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest[..SIGNATURE_LEN].to_string()
}

/// A stored draft and the context it was generated from.
#[derive(Debug, Clone)]
pub struct Draft {
    pub line: StoryLine,
    pub context: Vec<ContextItem>,
}

/// A signed line and the vector id its embedding will be stored under.
#[derive(Debug, Clone)]
pub struct SignedLine {
    pub line: StoryLine,
    pub embedding_id: String,
}

/// All lore grouped by category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoreCatalog {
    pub characters: Vec<LoreEntry>,
    pub locations: Vec<LoreEntry>,
    pub events: Vec<LoreEntry>,
    pub items: Vec<LoreEntry>,
}

impl LoreCatalog {
    fn push(&mut self, entry: LoreEntry) {
        match entry.category {
            LoreCategory::Character => self.characters.push(entry),
            LoreCategory::Location => self.locations.push(entry),
            LoreCategory::Event => self.events.push(entry),
            LoreCategory::Item => self.items.push(entry),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
}

/// Dependency status. Always produced, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub database_ok: bool,
    pub vector_store_connected: bool,
    #[serde(serialize_with = "backend_or_none")]
    pub vector_backend: Option<VectorBackend>,
}

fn backend_or_none<S: Serializer>(
    backend: &Option<VectorBackend>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match backend {
        Some(b) => b.serialize(serializer),
        None => serializer.serialize_str("none"),
    }
}

/// Entry point for every interactive story operation.
pub struct StoryService {
    components: StoryComponents,
    rag: RagOrchestrator,
    canonicalizer: Canonicalizer,
}

impl StoryService {
    pub fn new(components: StoryComponents, rag: &RagConfig) -> Self {
        let orchestrator = RagOrchestrator::new(
            components.index.clone(),
            components.embedder.clone(),
            components.writer.clone(),
            rag.max_context_lines,
        );
        let canonicalizer =
            Canonicalizer::new(components.storage.clone(), components.writer.clone());
        Self {
            components,
            rag: orchestrator,
            canonicalizer,
        }
    }

    pub fn components(&self) -> &StoryComponents {
        &self.components
    }

    /// Queues an embedding job. Failure is logged, never surfaced: the row is
    /// already committed and simply stays unenriched.
    async fn schedule_embedding(&self, kind: IndexJobKind, target_id: i64) {
        match self
            .components
            .storage
            .enqueue_index_job(kind, target_id)
            .await
        {
            Ok(job_id) => {
                debug!(job_id, %kind, target_id, "embedding job queued");
                self.components.index_signal.notify_one();
            }
            Err(e) => {
                warn!(%kind, target_id, error = %e, "failed to queue embedding job (non-fatal)");
            }
        }
    }

    /// Generates a grounded suggestion and stores it as an unverified draft.
    pub async fn request_suggestion(&self, prompt: &str, user_id: &str) -> Result<Draft, SagaError> {
        let suggestion = self.rag.generate_with_context(prompt).await?;

        let line = self
            .components
            .storage
            .append_line(NewStoryLine {
                user_id: user_id.to_string(),
                text: suggestion.text.clone(),
                llm_proposed: Some(suggestion.text),
                user_edited: false,
                verified: false,
                signature: None,
                context_used: suggestion.context.iter().map(|c| c.text.clone()).collect(),
            })
            .await?;

        info!(
            line_id = line.id,
            line_number = line.line_number,
            context_count = suggestion.context_count,
            "draft line stored"
        );
        Ok(Draft {
            line,
            context: suggestion.context,
        })
    }

    /// Appends the user's final text as a new verified line and schedules
    /// its embedding.
    pub async fn edit_and_sign(
        &self,
        llm_proposed: Option<&str>,
        final_text: &str,
        user_id: &str,
    ) -> Result<SignedLine, SagaError> {
        let line = self
            .components
            .storage
            .append_line(NewStoryLine {
                user_id: user_id.to_string(),
                text: final_text.to_string(),
                llm_proposed: llm_proposed.map(str::to_string),
                user_edited: llm_proposed != Some(final_text),
                verified: true,
                signature: Some(line_signature(final_text)),
                context_used: Vec::new(),
            })
            .await?;

        info!(
            line_id = line.id,
            line_number = line.line_number,
            user_edited = line.user_edited,
            "line signed"
        );

        self.schedule_embedding(IndexJobKind::StoryLine, line.id).await;
        Ok(SignedLine {
            embedding_id: story_line_embedding_id(line.id),
            line,
        })
    }

    /// Marks an existing line verified in place and schedules its embedding.
    pub async fn verify_line(
        &self,
        line_id: i64,
        signature: Option<&str>,
    ) -> Result<StoryLine, SagaError> {
        let signature = signature
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SIGNATURE);
        let line = self
            .components
            .storage
            .verify_line(line_id, signature)
            .await?
            .ok_or_else(|| SagaError::NotFound(format!("story line {line_id}")))?;

        self.schedule_embedding(IndexJobKind::StoryLine, line.id).await;
        Ok(line)
    }

    pub async fn list_lines(&self, verified_only: bool) -> Result<Vec<StoryLine>, SagaError> {
        self.components.storage.list_lines(verified_only).await
    }

    /// Extracts lore from the given lines, drafts included, and stores every
    /// entity.
    ///
    /// Extraction failures yield an empty set; a selection matching no line
    /// is [`SagaError::NotFound`].
    pub async fn extract_lore(&self, line_ids: &[i64]) -> Result<LoreSet, SagaError> {
        let lines = self.components.storage.lines_by_ids(line_ids).await?;
        if lines.is_empty() {
            return Err(SagaError::NotFound("no story lines in selection".into()));
        }

        let source_ids: Vec<i64> = lines.iter().map(|l| l.id).collect();
        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        let lore = self.components.writer.extract_lore(&texts).await;

        for (category, item) in lore.iter() {
            let entry = self
                .components
                .storage
                .insert_lore(NewLoreEntry {
                    category,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    source_line_ids: source_ids.clone(),
                    confidence: EXTRACTED_LORE_CONFIDENCE,
                })
                .await?;
            self.schedule_embedding(IndexJobKind::LoreEntry, entry.id).await;
        }

        info!(entries = lore.total(), lines = source_ids.len(), "lore extracted");
        Ok(lore)
    }

    pub async fn list_lore(&self) -> Result<LoreCatalog, SagaError> {
        let mut catalog = LoreCatalog::default();
        for entry in self.components.storage.list_lore().await? {
            catalog.push(entry);
        }
        Ok(catalog)
    }

    pub async fn canonicalize(
        &self,
        line_ids: Option<&[i64]>,
        title: Option<&str>,
    ) -> Result<CanonicalStory, SagaError> {
        self.canonicalizer.canonicalize(line_ids, title).await
    }

    pub async fn get_canonical(&self, id: i64) -> Result<CanonicalStory, SagaError> {
        self.components
            .storage
            .get_canonical(id)
            .await?
            .ok_or_else(|| SagaError::NotFound(format!("canonical story {id}")))
    }

    /// Nearest stored texts for `query`. Empty when retrieval is unavailable.
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
    ) -> Vec<ContextItem> {
        self.rag.retrieve_context(query, top_k, category).await
    }

    pub async fn health(&self) -> HealthReport {
        let database_ok = matches!(
            self.components.storage.health_check().await,
            Ok(HealthStatus::Healthy)
        );
        let index = &self.components.index;
        let vector_store_connected = index.is_available();
        let status = if database_ok && vector_store_connected {
            HealthState::Healthy
        } else {
            HealthState::Degraded
        };
        HealthReport {
            status,
            database_ok,
            vector_store_connected,
            vector_backend: index.backend(),
        }
    }
}

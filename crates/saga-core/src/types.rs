// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types used across adapter traits, the ledger, and the vector store.

use serde::{Deserialize, Serialize};

/// Category tag for signed story lines in the vector store.
pub const STORY_LINE_CATEGORY: &str = "story_line";

/// Category tag for rolling chunk summaries in the vector store.
pub const SUMMARY_CATEGORY: &str = "summary";

/// Vector store id of a signed story line.
pub fn story_line_embedding_id(line_id: i64) -> String {
    format!("{STORY_LINE_CATEGORY}_{line_id}")
}

/// Vector store id of the summary over lines `start..end` (0-based, exclusive end).
pub fn summary_embedding_id(start: usize, end: usize) -> String {
    format!("{SUMMARY_CATEGORY}_{start}_{end}")
}

/// The kind of adapter a plugin provides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum AdapterType {
    /// Text generation (chat completion) backend.
    Provider,
    /// Text embedding backend.
    Embedding,
    /// Nearest-neighbour vector index.
    VectorStore,
    /// Ledger persistence.
    Storage,
}

/// Health status reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but degraded.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

// --- Embedding types ---

/// Batch of texts to embed.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Embedding vectors, one per input text, in input order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Provider types ---

/// A single chat message sent to the generation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ProviderMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One stateless completion request: instruction, payload, and sampling knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Token accounting returned with a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single text completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

// --- Vector store types ---

/// Which backend is serving vector requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Milvus,
    Memory,
}

/// An (id, text, category, embedding) tuple owned by the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub embedding_id: String,
    pub text: String,
    pub category: String,
    pub vector: Vec<f32>,
}

/// One nearest-neighbour result. Identical shape for every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub embedding_id: String,
    pub text: String,
    pub category: String,
    /// Smaller is closer. Squared L2 on Milvus, `1 - cosine` in memory.
    pub distance: f32,
}

// --- Ledger types ---

/// One unit of narrative in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryLine {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    /// 1-based sequence position, unique within the ledger.
    pub line_number: i64,
    pub llm_proposed: Option<String>,
    pub user_edited: bool,
    pub verified: bool,
    pub signature: Option<String>,
    /// Texts of the context items used to produce a draft.
    pub context_used: Vec<String>,
    pub embedding_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a line about to be appended; the ledger assigns id and position.
#[derive(Debug, Clone, Default)]
pub struct NewStoryLine {
    pub user_id: String,
    pub text: String,
    pub llm_proposed: Option<String>,
    pub user_edited: bool,
    pub verified: bool,
    pub signature: Option<String>,
    pub context_used: Vec<String>,
}

/// The fixed set of lore entity categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoreCategory {
    Character,
    Location,
    Event,
    Item,
}

impl LoreCategory {
    /// All categories in display order.
    pub const ALL: [LoreCategory; 4] = [
        LoreCategory::Character,
        LoreCategory::Location,
        LoreCategory::Event,
        LoreCategory::Item,
    ];

    /// Plural form used as the JSON list key (`characters`, `locations`, ...).
    pub fn plural(&self) -> &'static str {
        match self {
            LoreCategory::Character => "characters",
            LoreCategory::Location => "locations",
            LoreCategory::Event => "events",
            LoreCategory::Item => "items",
        }
    }

    /// Vector store category tag, e.g. `lore_character`.
    pub fn vector_category(&self) -> String {
        format!("lore_{self}")
    }

    /// Deterministic vector store id for a lore row.
    pub fn embedding_id(&self, lore_id: i64) -> String {
        format!("lore_{self}_{lore_id}")
    }
}

/// An extracted character, location, event, or item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreEntry {
    pub id: i64,
    pub category: LoreCategory,
    pub name: String,
    pub description: String,
    pub source_line_ids: Vec<i64>,
    pub confidence: f64,
    pub embedding_id: Option<String>,
    pub created_at: String,
}

impl LoreEntry {
    /// Text that gets embedded for retrieval.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// Fields for a new lore row.
#[derive(Debug, Clone)]
pub struct NewLoreEntry {
    pub category: LoreCategory,
    pub name: String,
    pub description: String,
    pub source_line_ids: Vec<i64>,
    pub confidence: f64,
}

/// A finalized narrative snapshot. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStory {
    pub id: i64,
    pub title: String,
    pub full_text: String,
    pub original_lines_count: i64,
    pub canonicalized_by: String,
    pub version: i64,
    pub created_at: String,
    pub finalized_at: Option<String>,
}

/// Fields for a new canonical story.
#[derive(Debug, Clone)]
pub struct NewCanonicalStory {
    pub title: String,
    pub full_text: String,
    pub original_lines_count: i64,
    pub canonicalized_by: String,
}

// --- Index queue types ---

/// What an embedding job points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum IndexJobKind {
    StoryLine,
    LoreEntry,
}

/// A leased embedding job taken from the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexJob {
    pub id: i64,
    pub kind: IndexJobKind,
    pub target_id: i64,
    pub attempts: i64,
    pub max_attempts: i64,
}

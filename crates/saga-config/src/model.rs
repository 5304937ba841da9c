// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key fails
//! at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Saga configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SagaConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Ledger database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation provider (OpenAI-compatible chat completions).
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Local embedding model.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Primary vector index server.
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Retrieval defaults.
    #[serde(default)]
    pub rag: RagConfig,

    /// Periodic lore and summary jobs.
    #[serde(default)]
    pub consolidator: ConsolidatorConfig,

    /// Background embedding worker.
    #[serde(default)]
    pub indexer: IndexerConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Ledger storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("saga").join("saga.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("saga.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Generation provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// API key. Falls back to the `GROQ_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_provider_model")]
    pub model: String,

    /// Upper bound on a single generation call, retries included.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient HTTP statuses (429, 5xx).
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            model: default_provider_model(),
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_provider_max_retries(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_provider_model() -> String {
    "llama-3.1-70b-versatile".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    60
}

fn default_provider_max_retries() -> u32 {
    1
}

/// Embedding model settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Model identifier, used as the cache directory name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Output vector dimension. Must match the vector store collection.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Directory where model files are downloaded and cached.
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            model_dir: default_model_dir(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_model_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("saga").join("models"))
        .unwrap_or_else(|| std::path::PathBuf::from("models"))
        .to_string_lossy()
        .into_owned()
}

/// Primary vector store (Milvus) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VectorStoreConfig {
    /// When false the in-memory index is used without trying the server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_vector_host")]
    pub host: String,

    #[serde(default = "default_vector_port")]
    pub port: u16,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// How long to wait for the server before falling back to memory.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Optional bearer token (`user:password` or API key).
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_vector_host(),
            port: default_vector_port(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
            token: None,
        }
    }
}

impl VectorStoreConfig {
    /// Base URL of the server's REST endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_true() -> bool {
    true
}

fn default_vector_host() -> String {
    "localhost".to_string()
}

fn default_vector_port() -> u16 {
    19530
}

fn default_collection() -> String {
    "story_embeddings".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Retrieval settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RagConfig {
    /// Number of context items retrieved for a suggestion.
    #[serde(default = "default_max_context_lines")]
    pub max_context_lines: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_context_lines: default_max_context_lines(),
        }
    }
}

fn default_max_context_lines() -> usize {
    10
}

/// Periodic consolidation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_lore_interval_secs")]
    pub lore_interval_secs: u64,

    /// Number of most recent verified lines fed to each lore run.
    #[serde(default = "default_lore_batch_size")]
    pub lore_batch_size: usize,

    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,

    /// Lines per summary chunk.
    #[serde(default = "default_summary_chunk_size")]
    pub summary_chunk_size: usize,

    /// The summary job is skipped below this many verified lines.
    #[serde(default = "default_summary_min_lines")]
    pub summary_min_lines: usize,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lore_interval_secs: default_lore_interval_secs(),
            lore_batch_size: default_lore_batch_size(),
            summary_interval_secs: default_summary_interval_secs(),
            summary_chunk_size: default_summary_chunk_size(),
            summary_min_lines: default_summary_min_lines(),
        }
    }
}

fn default_lore_interval_secs() -> u64 {
    30 * 60
}

fn default_lore_batch_size() -> usize {
    20
}

fn default_summary_interval_secs() -> u64 {
    60 * 60
}

fn default_summary_chunk_size() -> usize {
    10
}

fn default_summary_min_lines() -> usize {
    5
}

/// Background embedding worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Attempts per job before it is marked failed and dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds a dequeued job stays leased before another worker may take it.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Fallback poll interval when no enqueue notification arrives.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lease_secs: default_lease_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_lease_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    5
}

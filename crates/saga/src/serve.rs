// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `saga serve`: wires storage, retrieval and generation together, then runs
//! the HTTP API alongside the indexer and consolidator until a signal arrives.

use std::sync::Arc;

use saga_agent::{Consolidator, Indexer, StoryComponents, StoryService, install_signal_handler};
use saga_config::SagaConfig;
use saga_core::{SagaError, StorageAdapter};
use saga_gateway::GatewayState;
use saga_memory::StoryWriter;
use saga_openai::OpenAiProvider;
use saga_storage::SqliteStorage;
use saga_vector::VectorIndex;
use tracing::{error, info, warn};

/// Crates whose logs follow the configured level; everything else stays at `warn`.
const LOG_TARGETS: &[&str] = &[
    "saga",
    "saga_agent",
    "saga_config",
    "saga_gateway",
    "saga_memory",
    "saga_openai",
    "saga_storage",
    "saga_vector",
    "tower_http",
];

fn default_filter(log_level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the config level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Everything a command needs, plus the handles to release on exit.
pub struct Stack {
    pub components: StoryComponents,
    pub index: Arc<VectorIndex>,
}

impl Stack {
    /// Opens the ledger, connects the vector index (falling back to memory),
    /// loads the embedding model and builds the generation provider.
    pub async fn open(config: &SagaConfig) -> Result<Self, SagaError> {
        let storage =
            SqliteStorage::new(config.storage.clone()).with_queue_policy(&config.indexer);
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        info!(path = %config.storage.database_path, "story ledger opened");

        let index = Arc::new(VectorIndex::new(
            config.vector_store.clone(),
            config.embedding.dimensions,
        ));
        if index.connect().await {
            info!(endpoint = %config.vector_store.endpoint(), "vector store connected");
        }

        let embedder = saga_memory::load_embedder(&config.embedding)
            .await
            .inspect_err(|e| error!(error = %e, "failed to load embedding model"))?;

        let provider = OpenAiProvider::new(&config.provider).map_err(|e| {
            error!(error = %e, "failed to initialize generation provider");
            eprintln!(
                "error: an API key is required. Set provider.api_key, SAGA_PROVIDER_API_KEY or GROQ_API_KEY"
            );
            e
        })?;
        let writer = Arc::new(StoryWriter::new(
            Arc::new(provider),
            config.provider.model.clone(),
        ));

        let components =
            StoryComponents::new(storage, index.clone(), Arc::new(embedder), writer);
        Ok(Self { components, index })
    }

    /// Disconnects the vector index and closes the ledger.
    pub async fn close(self) {
        self.index.disconnect().await;
        if let Err(e) = self.components.storage.close().await {
            warn!(error = %e, "failed to close story ledger cleanly");
        }
    }
}

/// Runs `saga serve`.
pub async fn run_serve(config: SagaConfig) -> Result<(), SagaError> {
    info!("starting saga serve");

    let stack = Stack::open(&config).await?;
    let cancel = install_signal_handler();

    let indexer = Arc::new(Indexer::new(stack.components.clone(), &config.indexer));
    let mut workers = vec![indexer.spawn(cancel.clone())];

    if config.consolidator.enabled {
        let consolidator = Arc::new(Consolidator::new(
            stack.components.clone(),
            config.consolidator.clone(),
        ));
        workers.extend(consolidator.spawn(cancel.clone()));
    } else {
        info!("periodic consolidation disabled by configuration");
    }

    let state = GatewayState {
        service: Arc::new(StoryService::new(stack.components.clone(), &config.rag)),
    };
    let served = saga_gateway::start_server(&config.server, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the workers either way.
    cancel.cancel();
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "background worker ended abnormally");
        }
    }

    stack.close().await;
    info!("saga stopped");
    served
}

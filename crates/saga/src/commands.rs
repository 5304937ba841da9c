// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands: consolidation runs, canonicalization, config check.

use saga_agent::{Canonicalizer, Consolidator};
use saga_config::SagaConfig;
use saga_core::SagaError;
use saga_openai::OpenAiProvider;

use crate::ConsolidateJob;
use crate::serve::Stack;

pub async fn run_consolidate(config: SagaConfig, job: ConsolidateJob) -> Result<(), SagaError> {
    let stack = Stack::open(&config).await?;
    if !stack.index.is_available() {
        tracing::warn!("vector store offline, results go to the in-memory index and are not kept");
    }
    let consolidator = Consolidator::new(stack.components.clone(), config.consolidator.clone());

    let outcome = match job {
        ConsolidateJob::Lore => consolidator.run_lore_job().await.map(|run| {
            println!(
                "lore: {} lines read, {} entries stored, {} deferred to the indexer",
                run.lines_read, run.entries_stored, run.entries_deferred
            );
        }),
        ConsolidateJob::Summary => consolidator.run_summary_job().await.map(|run| {
            if run.skipped {
                println!(
                    "summary: skipped, {} verified lines (minimum {})",
                    run.lines_read, config.consolidator.summary_min_lines
                );
            } else {
                println!(
                    "summary: {} lines read, {} chunks indexed, {} failed",
                    run.lines_read, run.chunks_indexed, run.chunks_failed
                );
            }
        }),
    };

    stack.close().await;
    outcome
}

pub async fn run_canonicalize(
    config: SagaConfig,
    title: Option<String>,
    line_ids: Vec<i64>,
) -> Result<(), SagaError> {
    let stack = Stack::open(&config).await?;
    let canonicalizer = Canonicalizer::new(
        stack.components.storage.clone(),
        stack.components.writer.clone(),
    );
    let selection = (!line_ids.is_empty()).then_some(line_ids.as_slice());
    let outcome = canonicalizer
        .canonicalize(selection, title.as_deref())
        .await
        .map(|story| {
            println!(
                "canonical story {} \"{}\" from {} lines\n\n{}",
                story.id, story.title, story.original_lines_count, story.full_text
            );
        });

    stack.close().await;
    outcome
}

/// Prints the effective configuration summary. Validation already ran at load.
pub fn run_config_check(config: &SagaConfig) {
    println!("configuration OK");
    println!("  server        {}:{}", config.server.host, config.server.port);
    println!("  ledger        {}", config.storage.database_path);
    println!(
        "  provider      {} ({})",
        config.provider.model, config.provider.base_url
    );
    println!(
        "  embedding     {} ({} dims, cached in {})",
        config.embedding.model, config.embedding.dimensions, config.embedding.model_dir
    );
    if config.vector_store.enabled {
        println!(
            "  vector store  {} / {}",
            config.vector_store.endpoint(),
            config.vector_store.collection
        );
    } else {
        println!("  vector store  disabled (in-memory index)");
    }
    match OpenAiProvider::new(&config.provider) {
        Ok(_) => println!("  api key       present"),
        Err(e) => println!("  api key       MISSING: {e}"),
    }
}

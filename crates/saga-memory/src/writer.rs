// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generation roles: suggestion, lore extraction, summary, and
//! canonicalization.
//!
//! Every role is one stateless completion against the same provider; they
//! differ in instruction, sampling, and how output is interpreted.

use std::sync::Arc;

use saga_core::SagaError;
use saga_core::traits::ProviderAdapter;
use saga_core::types::{ProviderMessage, ProviderRequest};
use tracing::{debug, warn};

use crate::lore::{LoreSet, parse_lore};

const SUGGESTION_INSTRUCTION: &str = "You are a creative co-author. Using the story context \
and the author's request, write the next line of the story: one to three sentences that \
continue naturally, honor the request, and stay consistent with established characters, \
places, and events. Reply with the story text only.";

const LORE_INSTRUCTION: &str = "You catalogue story lore. Read the passage and list the \
characters, locations, events, and significant items it mentions, each with a short \
description. Reply with a single JSON object of the form \
{\"characters\": [{\"name\": \"...\", \"description\": \"...\"}], \"locations\": [...], \
\"events\": [...], \"items\": [...]} and nothing else.";

const SUMMARY_INSTRUCTION: &str = "You summarize stories. Capture the key plot points, \
characters, and themes of the passage in under 200 words.";

const CANONICAL_INSTRUCTION: &str = "You are a story editor. Rewrite the numbered lines \
as one polished narrative in a few cohesive paragraphs. Keep every plot point and \
character action, smooth the flow, fix inconsistencies, and keep the author's voice. \
Do not number the output. Reply with the story only.";

/// Placeholder context when retrieval found nothing.
pub const NO_CONTEXT_MARKER: &str = "No previous context available.";

/// Sampling profile for one role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenerationRole {
    Suggestion,
    LoreExtraction,
    Summary,
    Canonicalization,
}

impl GenerationRole {
    pub fn temperature(self) -> f32 {
        match self {
            GenerationRole::Suggestion => 0.7,
            GenerationRole::LoreExtraction | GenerationRole::Summary => 0.3,
            GenerationRole::Canonicalization => 0.5,
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            GenerationRole::Suggestion => 200,
            GenerationRole::LoreExtraction => 1000,
            GenerationRole::Summary => 300,
            GenerationRole::Canonicalization => 2000,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            GenerationRole::Suggestion => SUGGESTION_INSTRUCTION,
            GenerationRole::LoreExtraction => LORE_INSTRUCTION,
            GenerationRole::Summary => SUMMARY_INSTRUCTION,
            GenerationRole::Canonicalization => CANONICAL_INSTRUCTION,
        }
    }
}

/// Runs the generation roles against one provider and model.
pub struct StoryWriter {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl StoryWriter {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Identity recorded on canonical stories.
    pub fn canonicalizer_identity(&self) -> String {
        format!("canonicalizer ({})", self.model)
    }

    async fn run(&self, role: GenerationRole, payload: String) -> Result<String, SagaError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(role.instruction().to_string()),
            messages: vec![ProviderMessage::user(payload)],
            max_tokens: role.max_tokens(),
            temperature: role.temperature(),
        };
        let response = self.provider.complete(request).await?;
        debug!(
            ?role,
            output_tokens = response.usage.output_tokens,
            "generation complete"
        );
        Ok(response.content.trim().to_string())
    }

    /// Proposes the next line for `prompt` given retrieved context texts.
    pub async fn suggest(&self, prompt: &str, context: &[String]) -> Result<String, SagaError> {
        self.run(GenerationRole::Suggestion, suggestion_payload(prompt, context))
            .await
    }

    /// Extracts lore from `lines`. Never fails: provider errors and
    /// malformed output both yield an empty set.
    pub async fn extract_lore(&self, lines: &[String]) -> LoreSet {
        match self
            .run(GenerationRole::LoreExtraction, lines.join("\n"))
            .await
        {
            Ok(raw) => parse_lore(&raw),
            Err(e) => {
                warn!(error = %e, "lore extraction failed, returning empty result");
                LoreSet::default()
            }
        }
    }

    /// Summarizes a chunk of lines.
    pub async fn summarize(&self, lines: &[String]) -> Result<String, SagaError> {
        self.run(GenerationRole::Summary, lines.join("\n")).await
    }

    /// Rewrites `lines` as one polished narrative.
    pub async fn canonicalize(&self, lines: &[String]) -> Result<String, SagaError> {
        self.run(GenerationRole::Canonicalization, numbered_lines(lines))
            .await
    }
}

fn suggestion_payload(prompt: &str, context: &[String]) -> String {
    let context = if context.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        context
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("Story context:\n{context}\n\nRequest: {prompt}\n\nNext line:")
}

fn numbered_lines(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

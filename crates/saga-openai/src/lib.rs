// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation provider for OpenAI-compatible chat completion APIs.
//!
//! Groq is the default deployment. Any server exposing
//! `POST {base_url}/chat/completions` with bearer auth works.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use saga_config::model::ProviderConfig;
use saga_core::traits::{PluginAdapter, ProviderAdapter};
use saga_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};
use saga_core::SagaError;
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::types::{ChatMessage, ChatRequest};

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Chat-completions provider implementing [`ProviderAdapter`].
///
/// Every call is bounded by `provider.timeout_secs`; exceeding it yields
/// [`SagaError::Timeout`].
pub struct OpenAiProvider {
    client: ChatClient,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a provider from configuration.
    ///
    /// API key resolution: `provider.api_key`, then `GROQ_API_KEY`, else error.
    pub fn new(config: &ProviderConfig) -> Result<Self, SagaError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = ChatClient::new(&config.base_url, &api_key, timeout, config.max_retries)?;

        info!(
            base_url = config.base_url,
            model = config.model,
            "generation provider initialized"
        );

        Ok(Self { client, timeout })
    }

    #[cfg(test)]
    fn with_client(client: ChatClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Maps a provider request onto the chat-completions wire shape.
///
/// The system prompt, if any, becomes the leading `system` message.
fn to_chat_request(request: &ProviderRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system_prompt {
        messages.push(ChatMessage {
            role: "system".into(),
            content: system.clone(),
        });
    }
    messages.extend(request.messages.iter().map(|m| ChatMessage {
        role: m.role.clone(),
        content: m.content.clone(),
    }));

    ChatRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        // No test request: health checks must not spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        debug!("generation provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SagaError> {
        let chat_request = to_chat_request(&request);

        let response = tokio::time::timeout(self.timeout, self.client.complete(&chat_request))
            .await
            .map_err(|_| SagaError::Timeout {
                duration: self.timeout,
            })??;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SagaError::Provider {
                message: "response contained no choices".into(),
                source: None,
            })?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            id: response.id,
            content: choice.message.content.unwrap_or_default(),
            model: if response.model.is_empty() {
                request.model
            } else {
                response.model
            },
            stop_reason: choice.finish_reason,
            usage,
        })
    }
}

/// Resolves the API key: config first, then [`API_KEY_ENV`].
fn resolve_api_key(config_key: &Option<String>) -> Result<String, SagaError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var(API_KEY_ENV).map_err(|_| {
        SagaError::Config(format!(
            "generation API key not found. Set provider.api_key in config or the {API_KEY_ENV} environment variable."
        ))
    })
}

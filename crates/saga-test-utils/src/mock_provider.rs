// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted generation provider.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use saga_core::traits::{PluginAdapter, ProviderAdapter};
use saga_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};
use saga_core::SagaError;
use tokio::sync::Mutex;

/// Default text once the queue is empty.
pub const DEFAULT_RESPONSE: &str = "mock response";

/// A provider that replays queued responses in FIFO order.
///
/// Every request is captured for assertions. Failures can be scheduled
/// with [`fail_next`](Self::fail_next).
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    failures: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Makes the next `n` calls fail with a provider error.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SagaError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        if self.take_failure() {
            return Err(SagaError::Provider {
                message: "mock provider failure".into(),
                source: None,
            });
        }

        let content = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| DEFAULT_RESPONSE.to_string());

        Ok(ProviderResponse {
            id: "mock-completion".into(),
            content,
            model,
            stop_reason: Some("stop".into()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "mock-model".into(),
            system_prompt: None,
            messages: vec![],
            max_tokens: 10,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn replays_in_order_then_default() {
        let provider = MockProvider::with_responses(["first", "second"]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            DEFAULT_RESPONSE
        );
        assert_eq!(provider.request_count().await, 3);
    }

    #[tokio::test]
    async fn scheduled_failures_do_not_consume_responses() {
        let provider = MockProvider::with_responses(["kept"]);
        provider.fail_next(1);
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(provider.complete(request()).await.unwrap().content, "kept");
    }
}

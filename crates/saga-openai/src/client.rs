// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completion APIs.
//!
//! Handles bearer authentication and retries transient statuses
//! (429, 500, 502, 503) a bounded number of times.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use saga_core::SagaError;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Delay before retrying a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl ChatClient {
    /// Creates a client for `base_url` (e.g. `https://api.groq.com/openai/v1`).
    ///
    /// `connect_timeout` bounds connection setup only; the overall deadline
    /// for a completion is enforced by the caller.
    pub fn new(
        base_url: &str,
        api_key: &str,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, SagaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| SagaError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SagaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            max_retries,
        })
    }

    /// Sends one completion request, retrying transient failures.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, SagaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = match self.client.post(&self.endpoint).json(request).send().await {
                Ok(response) => response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries => {
                    warn!(error = %e, "transport error, will retry");
                    last_error = Some(SagaError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
                Err(e) => {
                    return Err(SagaError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                return response.json::<ChatResponse>().await.map_err(|e| SagaError::Provider {
                    message: format!("failed to parse API response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "API error {status} ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(SagaError::Provider {
                    message,
                    source: None,
                });
                continue;
            }

            return Err(SagaError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| SagaError::Provider {
            message: "completion request failed after retries".into(),
            source: None,
        }))
    }
}

/// HTTP statuses worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

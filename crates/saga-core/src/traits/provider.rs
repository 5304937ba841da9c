// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for text generation backends.

use async_trait::async_trait;

use crate::error::SagaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// A stateless text-completion capability.
///
/// The same provider serves every generation role; roles differ only in the
/// instruction, sampling temperature, and how the caller parses the output.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SagaError>;
}

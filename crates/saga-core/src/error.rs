// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Saga story service.

use thiserror::Error;

/// The primary error type shared by every Saga crate.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Configuration errors (invalid values, missing credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger storage errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation provider errors (HTTP failure, bad status, unparseable body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector store errors (unreachable server, rejected request).
    #[error("vector store error: {message}")]
    VectorStore {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding model errors (model load, tokenization, inference).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A requested line, story, or selection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SagaError {
    /// Shorthand for a storage error carrying only a message.
    pub fn storage_msg(message: impl Into<String>) -> Self {
        SagaError::Storage {
            source: message.into().into(),
        }
    }

    /// Shorthand for a vector store error without an underlying cause.
    pub fn vector(message: impl Into<String>) -> Self {
        SagaError::VectorStore {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for the client-facing "not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SagaError::NotFound(_))
    }

    /// Returns true when a background worker may usefully try again.
    ///
    /// Dependency outages and timeouts are retryable; configuration problems
    /// and missing rows are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SagaError::Provider { .. }
                | SagaError::VectorStore { .. }
                | SagaError::Embedding(_)
                | SagaError::Storage { .. }
                | SagaError::Timeout { .. }
        )
    }
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store backend trait.

use async_trait::async_trait;

use crate::error::SagaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{VectorBackend, VectorHit, VectorRecord};

/// A nearest-neighbour index over [`VectorRecord`]s.
///
/// Backends return identical hit shapes and ordering so callers never need
/// to know which one served a request.
#[async_trait]
pub trait VectorStore: PluginAdapter {
    /// Identifies the backend serving requests.
    fn backend(&self) -> VectorBackend;

    /// Inserts a record, replacing any existing record with the same id.
    async fn upsert(&self, record: VectorRecord) -> Result<(), SagaError>;

    /// Returns at most `k` hits ordered by ascending distance.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<VectorHit>, SagaError>;

    /// Number of stored records, optionally restricted to one category.
    async fn count(&self, category: Option<&str>) -> Result<usize, SagaError>;
}

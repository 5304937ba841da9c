// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process fallback vector store.
//!
//! A linear scan with cosine similarity, reported as the pseudo-distance
//! `1 - cosine` so hits look exactly like those from the primary backend.
//! Contents do not survive a restart.

use std::sync::Mutex;

use async_trait::async_trait;
use saga_core::types::{VectorBackend, VectorHit, VectorRecord};
use saga_core::{AdapterType, HealthStatus, PluginAdapter, SagaError, VectorStore};

/// Mutex-guarded list of records. The lock is never held across an await.
pub struct InMemoryStore {
    dimensions: usize,
    records: Mutex<Vec<VectorRecord>>,
}

impl InMemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: Mutex::new(Vec::new()),
        }
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, Vec<VectorRecord>>, SagaError> {
        self.records
            .lock()
            .map_err(|_| SagaError::Internal("in-memory vector store lock poisoned".into()))
    }
}

/// Cosine similarity of two vectors. Zero-length or mismatched inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        Ok(HealthStatus::Degraded(
            "serving from in-memory fallback".into(),
        ))
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend(&self) -> VectorBackend {
        VectorBackend::Memory
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), SagaError> {
        if record.vector.len() != self.dimensions {
            return Err(SagaError::vector(format!(
                "vector has {} dimensions, expected {}",
                record.vector.len(),
                self.dimensions
            )));
        }
        let mut records = self.records()?;
        match records
            .iter_mut()
            .find(|r| r.embedding_id == record.embedding_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<VectorHit>, SagaError> {
        let records = self.records()?;
        let mut hits: Vec<VectorHit> = records
            .iter()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .map(|r| VectorHit {
                embedding_id: r.embedding_id.clone(),
                text: r.text.clone(),
                category: r.category.clone(),
                distance: 1.0 - cosine_similarity(query, &r.vector),
            })
            .collect();
        drop(records);

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, category: Option<&str>) -> Result<usize, SagaError> {
        Ok(self
            .records()?
            .iter()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, category: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            embedding_id: id.into(),
            text: format!("text of {id}"),
            category: category.into(),
            vector,
        }
    }

    #[test]
    fn cosine_of_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn search_orders_by_ascending_distance() {
        let store = InMemoryStore::new(2);
        store.upsert(record("far", "story_line", vec![0.0, 1.0])).await.unwrap();
        store.upsert(record("near", "story_line", vec![1.0, 0.1])).await.unwrap();
        store.upsert(record("mid", "story_line", vec![1.0, 1.0])).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.embedding_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn search_respects_k_and_category() {
        let store = InMemoryStore::new(2);
        store.upsert(record("a", "story_line", vec![1.0, 0.0])).await.unwrap();
        store.upsert(record("b", "summary", vec![1.0, 0.0])).await.unwrap();
        store.upsert(record("c", "story_line", vec![0.5, 0.5])).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 1, Some("story_line")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].embedding_id, "a");

        let summaries = store.search(&[1.0, 0.0], 5, Some("summary")).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].category, "summary");
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let store = InMemoryStore::new(2);
        store.upsert(record("summary_0_10", "summary", vec![1.0, 0.0])).await.unwrap();
        let mut replacement = record("summary_0_10", "summary", vec![0.0, 1.0]);
        replacement.text = "rewritten".into();
        store.upsert(replacement).await.unwrap();

        assert_eq!(store.count(Some("summary")).await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(hits[0].text, "rewritten");
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let store = InMemoryStore::new(3);
        assert!(store.upsert(record("x", "story_line", vec![1.0])).await.is_err());
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}

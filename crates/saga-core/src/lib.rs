// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Saga story co-authoring service.
//!
//! Holds the error taxonomy, the adapter traits every backend implements,
//! and the data types that flow between the ledger, the vector store, and
//! the generation provider.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SagaError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, StorageAdapter, VectorStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_display_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Provider,
            AdapterType::Embedding,
            AdapterType::VectorStore,
            AdapterType::Storage,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).unwrap();
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        fn _provider(_: &dyn ProviderAdapter) {}
        fn _embedding(_: &dyn EmbeddingAdapter) {}
        fn _storage(_: &dyn StorageAdapter) {}
        fn _vector(_: &dyn VectorStore) {}
    }
}

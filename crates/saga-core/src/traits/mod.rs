// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Every adapter extends [`PluginAdapter`] and uses `#[async_trait]` so it
//! can be held as `Arc<dyn ...>` by the service layer.

pub mod adapter;
pub mod embedding;
pub mod provider;
pub mod storage;
pub mod vector;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
pub use vector::VectorStore;

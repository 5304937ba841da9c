// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Saga integration tests.
//!
//! - [`MockProvider`]: scripted generation responses with failure injection
//! - [`MockEmbedder`]: deterministic bag-of-words vectors
//! - [`TestHarness`]: the full story stack over temp storage

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::{HARNESS_DIMENSIONS, MOCK_MODEL, TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;

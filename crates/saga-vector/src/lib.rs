// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector storage for story retrieval.
//!
//! [`MilvusStore`] talks to a Milvus server over its REST API;
//! [`InMemoryStore`] is the in-process fallback. [`VectorIndex`] hides which
//! one is active.

pub mod index;
pub mod memory;
pub mod milvus;

pub use index::VectorIndex;
pub use memory::InMemoryStore;
pub use milvus::MilvusStore;

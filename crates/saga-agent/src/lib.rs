// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story orchestration for Saga.
//!
//! [`StoryService`] serves the interactive draft, sign, lore, and
//! canonicalize operations. [`Indexer`] drains the embedding queue and
//! [`Consolidator`] runs the periodic lore and summary jobs. All three are
//! built from one [`StoryComponents`] value.

pub mod canonicalizer;
pub mod components;
pub mod consolidator;
pub mod indexer;
pub mod service;
pub mod shutdown;

pub use canonicalizer::{Canonicalizer, DEFAULT_TITLE};
pub use components::StoryComponents;
pub use consolidator::{Consolidator, LoreRun, SummaryRun};
pub use indexer::{Indexer, IndexerStats, JobOutcome};
pub use service::{
    Draft, HealthReport, HealthState, LoreCatalog, SignedLine, StoryService, line_signature,
};
pub use shutdown::install_signal_handler;

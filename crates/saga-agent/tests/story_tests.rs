// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the interactive story operations.

use saga_agent::{DEFAULT_TITLE, HealthState, JobOutcome};
use saga_core::types::{IndexJobKind, STORY_LINE_CATEGORY, VectorBackend};
use saga_core::SagaError;
use saga_test_utils::{MOCK_MODEL, TestHarness};

#[tokio::test]
async fn serial_signs_number_lines_without_gaps() {
    let h = TestHarness::builder().build().await.unwrap();
    for i in 0..6 {
        h.service
            .edit_and_sign(None, &format!("Line {i}."), "author")
            .await
            .unwrap();
    }
    let numbers: Vec<i64> = h
        .service
        .list_lines(true)
        .await
        .unwrap()
        .iter()
        .map(|l| l.line_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn drafts_and_signed_lines_share_one_sequence() {
    let h = TestHarness::builder()
        .with_mock_responses(["The tower hums."])
        .build()
        .await
        .unwrap();

    let draft = h.service.request_suggestion("Begin", "author").await.unwrap();
    assert!(!draft.line.verified);
    assert_eq!(draft.line.line_number, 1);
    assert_eq!(draft.line.llm_proposed.as_deref(), Some("The tower hums."));

    let signed = h
        .service
        .edit_and_sign(Some("The tower hums."), "The tower hums softly.", "author")
        .await
        .unwrap();
    assert_eq!(signed.line.line_number, 2);
    assert!(signed.line.verified);
    assert!(signed.line.user_edited);
    assert_eq!(signed.embedding_id, format!("story_line_{}", signed.line.id));

    assert_eq!(h.service.list_lines(false).await.unwrap().len(), 2);
    assert_eq!(h.service.list_lines(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unchanged_proposal_is_not_user_edited() {
    let h = TestHarness::builder().build().await.unwrap();
    let signed = h
        .service
        .edit_and_sign(Some("Same words."), "Same words.", "author")
        .await
        .unwrap();
    assert!(!signed.line.user_edited);
    assert_eq!(
        signed.line.signature.as_deref(),
        Some(saga_agent::line_signature("Same words.").as_str())
    );
}

#[tokio::test]
async fn suggestion_is_grounded_on_signed_lines() {
    let h = TestHarness::builder()
        .with_mock_responses(["Flames lick the tower walls."])
        .build()
        .await
        .unwrap();

    let wizard = h.sign_and_index("A wizard lives in a tower.").await.unwrap();
    let stored = h.storage.get_line(wizard.id).await.unwrap().unwrap();
    assert_eq!(stored.embedding_id.as_deref(), Some("story_line_1"));

    let draft = h
        .service
        .request_suggestion("A dragon attacks", "author")
        .await
        .unwrap();
    assert!(!draft.context.is_empty());
    assert!(
        draft
            .context
            .iter()
            .any(|c| c.text.contains("A wizard lives in a tower."))
    );
    assert_eq!(draft.line.context_used, vec!["A wizard lives in a tower.".to_string()]);

    let requests = h.provider.requests().await;
    let payload = &requests[0].messages[0].content;
    assert!(payload.contains("- A wizard lives in a tower."), "got: {payload}");
    assert_eq!(requests[0].model, MOCK_MODEL);
}

#[tokio::test]
async fn suggestion_without_vector_store_is_ungrounded() {
    let h = TestHarness::builder()
        .with_mock_responses(["Something stirs."])
        .without_vector_store()
        .build()
        .await
        .unwrap();

    assert!(h.service.retrieve_context("anything", 5, None).await.is_empty());

    let draft = h.service.request_suggestion("Begin", "author").await.unwrap();
    assert_eq!(draft.line.text, "Something stirs.");
    assert!(draft.context.is_empty());

    let payload = &h.provider.requests().await[0].messages[0].content;
    assert!(payload.contains(saga_memory::writer::NO_CONTEXT_MARKER));
}

#[tokio::test]
async fn generation_failure_fails_the_draft_and_writes_nothing() {
    let h = TestHarness::builder().build().await.unwrap();
    h.provider.fail_next(1);

    let err = h.service.request_suggestion("Begin", "author").await.unwrap_err();
    assert!(matches!(err, SagaError::Provider { .. }), "got: {err}");
    assert!(h.service.list_lines(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn retrieve_context_respects_top_k_and_orders_by_score() {
    let h = TestHarness::builder().build().await.unwrap();
    for text in [
        "The dragon sleeps.",
        "The dragon wakes in fury.",
        "A merchant counts coins.",
        "Rain falls on the harbor.",
    ] {
        h.sign_and_index(text).await.unwrap();
    }

    let items = h
        .service
        .retrieve_context("dragon wakes in fury", 2, Some(STORY_LINE_CATEGORY))
        .await;
    assert_eq!(items.len(), 2);
    assert!(items[0].score >= items[1].score);
    assert!(items.iter().all(|c| c.score > 0.0 && c.score <= 1.0));
    assert_eq!(items[0].text, "The dragon wakes in fury.");
}

#[tokio::test]
async fn verify_marks_draft_and_queues_embedding() {
    let h = TestHarness::builder()
        .with_mock_responses(["A door opens."])
        .build()
        .await
        .unwrap();
    let draft = h.service.request_suggestion("Go on", "author").await.unwrap();

    let verified = h.service.verify_line(draft.line.id, None).await.unwrap();
    assert!(verified.verified);
    assert_eq!(verified.signature.as_deref(), Some("user_signed"));

    let stats = h.drain_index_queue().await.unwrap();
    assert_eq!(stats.indexed, 1);
    assert_eq!(h.index.count(Some(STORY_LINE_CATEGORY)).await.unwrap(), 1);
}

#[tokio::test]
async fn verify_unknown_line_is_not_found() {
    let h = TestHarness::builder().build().await.unwrap();
    let err = h.service.verify_line(404, Some("sig")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn indexing_retries_after_embedding_outage() {
    let h = TestHarness::builder().build().await.unwrap();
    h.embedder.set_failing(true);
    let signed = h
        .service
        .edit_and_sign(None, "The bridge collapses.", "author")
        .await
        .unwrap();

    let stats = h.drain_index_queue().await.unwrap();
    assert_eq!(stats.retrying, 1);
    assert_eq!(h.storage.pending_index_jobs().await.unwrap(), 1);
    assert!(
        h.storage
            .get_line(signed.line.id)
            .await
            .unwrap()
            .unwrap()
            .embedding_id
            .is_none()
    );

    h.embedder.set_failing(false);
    let stats = h.drain_index_queue().await.unwrap();
    assert_eq!(stats.indexed, 1);
    assert_eq!(h.storage.pending_index_jobs().await.unwrap(), 0);
    assert_eq!(
        h.storage.get_line(signed.line.id).await.unwrap().unwrap().embedding_id,
        Some(signed.embedding_id)
    );
}

#[tokio::test]
async fn indexing_gives_up_after_max_attempts() {
    let h = TestHarness::builder().build().await.unwrap();
    h.embedder.set_failing(true);
    h.service.edit_and_sign(None, "Lost.", "author").await.unwrap();

    let max = h.config.indexer.max_attempts as usize;
    let mut outcomes = Vec::new();
    for _ in 0..max {
        let stats = h.drain_index_queue().await.unwrap();
        outcomes.push(if stats.dropped == 1 {
            JobOutcome::Dropped
        } else {
            JobOutcome::Retrying
        });
    }
    assert_eq!(outcomes.last(), Some(&JobOutcome::Dropped));
    assert_eq!(h.storage.pending_index_jobs().await.unwrap(), 0);
    assert_eq!(h.storage.failed_index_jobs().await.unwrap(), 1);
}

#[tokio::test]
async fn job_for_missing_target_is_recorded_as_failed() {
    let h = TestHarness::builder().build().await.unwrap();
    h.storage
        .enqueue_index_job(IndexJobKind::LoreEntry, 999)
        .await
        .unwrap();

    let stats = h.drain_index_queue().await.unwrap();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.indexed, 0);
    assert_eq!(h.storage.pending_index_jobs().await.unwrap(), 0);
    assert_eq!(h.storage.failed_index_jobs().await.unwrap(), 1);
}

#[tokio::test]
async fn interactive_lore_extraction_stores_and_indexes_entries() {
    let lore = r#"```json
{"characters":[{"name":"Merla","description":"a wizard"}],
 "locations":[{"name":"The Tower","description":"where Merla lives"}],
 "events":[],"items":[]}
```"#;
    let h = TestHarness::builder()
        .with_mock_responses([lore])
        .build()
        .await
        .unwrap();
    let line = h.sign_and_index("Merla lives in the tower.").await.unwrap();

    let set = h.service.extract_lore(&[line.id]).await.unwrap();
    assert_eq!(set.total(), 2);

    let catalog = h.service.list_lore().await.unwrap();
    assert_eq!(catalog.characters.len(), 1);
    assert_eq!(catalog.characters[0].confidence, 0.8);
    assert_eq!(catalog.characters[0].source_line_ids, vec![line.id]);
    assert_eq!(catalog.locations[0].name, "The Tower");

    h.drain_index_queue().await.unwrap();
    assert_eq!(h.index.count(Some("lore_character")).await.unwrap(), 1);
    assert_eq!(h.index.count(Some("lore_location")).await.unwrap(), 1);
    let entry = h.storage.get_lore(catalog.characters[0].id).await.unwrap().unwrap();
    assert_eq!(
        entry.embedding_id,
        Some(format!("lore_character_{}", entry.id))
    );
}

#[tokio::test]
async fn malformed_lore_output_yields_empty_lists() {
    let h = TestHarness::builder()
        .with_mock_responses(["I could not find any lore, sorry!"])
        .build()
        .await
        .unwrap();
    let line = h.sign_and_index("Nothing happens.").await.unwrap();

    let set = h.service.extract_lore(&[line.id]).await.unwrap();
    assert!(set.is_empty());
    assert!(h.service.list_lore().await.unwrap().characters.is_empty());
}

#[tokio::test]
async fn lore_extraction_includes_draft_lines() {
    let h = TestHarness::builder()
        .with_mock_responses([
            "Orin forges a blade.",
            r#"{"characters":[{"name":"Orin","description":"a smith"}],"locations":[],"events":[],"items":[]}"#,
        ])
        .build()
        .await
        .unwrap();
    let draft = h.service.request_suggestion("Begin", "author").await.unwrap();
    assert!(!draft.line.verified);

    let set = h.service.extract_lore(&[draft.line.id]).await.unwrap();
    assert_eq!(set.characters[0].name, "Orin");

    let payload = &h.provider.requests().await[1].messages[0].content;
    assert!(payload.contains("Orin forges a blade."));
    let catalog = h.service.list_lore().await.unwrap();
    assert_eq!(catalog.characters[0].source_line_ids, vec![draft.line.id]);
}

#[tokio::test]
async fn lore_extraction_over_unknown_lines_is_not_found() {
    let h = TestHarness::builder().build().await.unwrap();
    let err = h.service.extract_lore(&[41, 42]).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.provider.request_count().await, 0);
}

#[tokio::test]
async fn canonicalize_uses_verified_lines_in_order() {
    let h = TestHarness::builder()
        .with_mock_responses(["Once, a wizard lived in a tower. Then the dragon came."])
        .build()
        .await
        .unwrap();
    h.service.edit_and_sign(None, "A wizard lives in a tower.", "a").await.unwrap();
    h.service.edit_and_sign(None, "A dragon attacks.", "a").await.unwrap();

    let story = h.service.canonicalize(None, None).await.unwrap();
    assert_eq!(story.title, DEFAULT_TITLE);
    assert_eq!(story.original_lines_count, 2);
    assert_eq!(story.canonicalized_by, format!("canonicalizer ({MOCK_MODEL})"));
    assert!(story.finalized_at.is_some());

    let payload = &h.provider.requests().await[0].messages[0].content;
    assert_eq!(payload, "1. A wizard lives in a tower.\n2. A dragon attacks.");

    let fetched = h.service.get_canonical(story.id).await.unwrap();
    assert_eq!(fetched.full_text, story.full_text);
}

#[tokio::test]
async fn canonicalize_respects_selection_and_title() {
    let h = TestHarness::builder().build().await.unwrap();
    let first = h.service.edit_and_sign(None, "First.", "a").await.unwrap();
    h.service.edit_and_sign(None, "Second.", "a").await.unwrap();

    let story = h
        .service
        .canonicalize(Some(&[first.line.id]), Some("The Tower"))
        .await
        .unwrap();
    assert_eq!(story.title, "The Tower");
    assert_eq!(story.original_lines_count, 1);
}

#[tokio::test]
async fn canonicalize_with_empty_id_list_uses_every_verified_line() {
    let h = TestHarness::builder().build().await.unwrap();
    h.service.edit_and_sign(None, "First.", "a").await.unwrap();
    h.service.edit_and_sign(None, "Second.", "a").await.unwrap();

    let story = h.service.canonicalize(Some(&[]), None).await.unwrap();
    assert_eq!(story.original_lines_count, 2);
    let payload = &h.provider.requests().await[0].messages[0].content;
    assert_eq!(payload, "1. First.\n2. Second.");
}

#[tokio::test]
async fn canonicalize_empty_selection_is_not_found_and_writes_nothing() {
    let h = TestHarness::builder().build().await.unwrap();
    let err = h.service.canonicalize(None, None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.provider.request_count().await, 0);
    assert!(h.service.get_canonical(1).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn health_reports_backend_and_degrades_without_vector_store() {
    let h = TestHarness::builder().build().await.unwrap();
    let report = h.service.health().await;
    assert_eq!(report.status, HealthState::Healthy);
    assert!(report.database_ok);
    assert_eq!(report.vector_backend, Some(VectorBackend::Memory));

    let h = TestHarness::builder().without_vector_store().build().await.unwrap();
    let report = h.service.health().await;
    assert_eq!(report.status, HealthState::Degraded);
    assert!(!report.vector_store_connected);
    assert_eq!(report.vector_backend, None);
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use saga_agent::StoryService;
use saga_gateway::{GatewayState, router};
use saga_test_utils::TestHarness;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(h: &TestHarness) -> Router {
    let service = StoryService::new(h.components.clone(), &h.config.rag);
    router(GatewayState {
        service: Arc::new(service),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn suggest_returns_unverified_draft() {
    let h = TestHarness::builder()
        .with_mock_responses(["The gate creaks open."])
        .build()
        .await
        .unwrap();
    let app = app(&h);

    let (status, body) = send(&app, "POST", "/suggest", Some(json!({"prompt": "Begin"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestion"], "The gate creaks open.");
    assert_eq!(body["verified"], false);
    assert_eq!(body["context_count"], 0);
    assert!(body["id"].as_i64().is_some());
}

#[tokio::test]
async fn blank_prompt_is_bad_request() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = app(&h);

    let (status, body) = send(&app, "POST", "/suggest", Some(json!({"prompt": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("prompt"));
    assert_eq!(h.provider.request_count().await, 0);
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let h = TestHarness::builder().build().await.unwrap();
    h.provider.fail_next(1);
    let app = app(&h);

    let (status, body) = send(&app, "POST", "/suggest", Some(json!({"prompt": "Begin"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
    assert!(h.service.list_lines(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_then_list_lines() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = app(&h);

    let (status, body) = send(
        &app,
        "POST",
        "/edit",
        Some(json!({
            "llm_proposed": "The gate creaks.",
            "final_text": "The gate creaks open slowly.",
            "user_id": "ana"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    let id = body["id"].as_i64().unwrap();
    assert_eq!(body["embedding_id"], format!("story_line_{id}"));

    let (status, lines) = send(&app, "GET", "/lines?verified_only=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let lines = lines.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["line_number"], 1);
    assert_eq!(lines[0]["user_edited"], true);
}

#[tokio::test]
async fn verify_without_body_uses_default_signature() {
    let h = TestHarness::builder()
        .with_mock_responses(["Rain falls."])
        .build()
        .await
        .unwrap();
    let app = app(&h);

    let (_, draft) = send(&app, "POST", "/suggest", Some(json!({"prompt": "weather"}))).await;
    let id = draft["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", &format!("/verify/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "verified", "line_id": id}));

    let lines = h.service.list_lines(true).await.unwrap();
    assert_eq!(lines[0].signature.as_deref(), Some("user_signed"));
}

#[tokio::test]
async fn verify_unknown_line_is_not_found() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = app(&h);

    let (status, body) = send(&app, "POST", "/verify/999", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn canonicalize_and_fetch() {
    let h = TestHarness::builder()
        .with_mock_responses(["Once there was a gate. It opened."])
        .build()
        .await
        .unwrap();
    let app = app(&h);

    let (status, _) = send(&app, "POST", "/canonicalize", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.service.edit_and_sign(None, "There was a gate.", "ana").await.unwrap();
    h.service.edit_and_sign(None, "It opened.", "ana").await.unwrap();

    let (status, story) = send(
        &app,
        "POST",
        "/canonicalize",
        Some(json!({"title": "The Gate"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["title"], "The Gate");
    assert_eq!(story["original_lines_count"], 2);
    assert_eq!(story["full_text"], "Once there was a gate. It opened.");

    let id = story["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/canonical/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["full_text"], story["full_text"]);

    let (status, _) = send(&app, "GET", "/canonical/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lore_extract_accepts_draft_lines() {
    let h = TestHarness::builder()
        .with_mock_responses([
            "Ana keeps the gate.",
            r#"{"characters":[{"name":"Ana","description":"a gatekeeper"}],"locations":[],"events":[],"items":[]}"#,
        ])
        .build()
        .await
        .unwrap();
    let app = app(&h);

    let (status, _) = send(&app, "POST", "/lore/extract", Some(json!({"line_ids": [7]}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, draft) = send(&app, "POST", "/suggest", Some(json!({"prompt": "gate"}))).await;
    assert_eq!(draft["verified"], false);
    let (status, lore) = send(
        &app,
        "POST",
        "/lore/extract",
        Some(json!({"line_ids": [draft["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lore["total_entries"], 1);
    assert_eq!(lore["characters"][0]["name"], "Ana");

    let (status, all) = send(&app, "GET", "/lore/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["characters"][0]["name"], "Ana");
    assert_eq!(all["characters"][0]["confidence"], 0.8);
    assert!(all["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn canonicalize_with_empty_line_ids_takes_all_verified_lines() {
    let h = TestHarness::builder()
        .with_mock_responses(["The gate stood. It opened."])
        .build()
        .await
        .unwrap();
    let app = app(&h);
    h.service.edit_and_sign(None, "The gate stood.", "ana").await.unwrap();
    h.service.edit_and_sign(None, "It opened.", "ana").await.unwrap();

    let (status, story) = send(&app, "POST", "/canonicalize", Some(json!({"line_ids": []}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["original_lines_count"], 2);
    assert_eq!(story["title"], "Untitled Story");
}

#[tokio::test]
async fn context_retrieve_reports_count() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = app(&h);
    h.sign_and_index("The dragon sleeps under the hill.").await.unwrap();
    h.sign_and_index("A wizard lives in a tower.").await.unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/context/retrieve",
        Some(json!({"query": "dragon under the hill", "top_k": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["text"], "The dragon sleeps under the hill.");
}

#[tokio::test]
async fn health_is_ok_even_when_degraded() {
    let h = TestHarness::builder()
        .without_vector_store()
        .build()
        .await
        .unwrap();
    let app = app(&h);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database_ok"], true);
    assert_eq!(body["vector_store_connected"], false);
    assert_eq!(body["vector_backend"], "none");
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers and their wire types.

use axum::Json;
use axum::extract::{Path, Query, State};
use saga_agent::{HealthReport, LoreCatalog};
use saga_core::types::{CanonicalStory, LoreEntry, StoryLine};
use saga_memory::{ContextItem, LoreItem, LoreSet};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Default `top_k` for `/context/retrieve`.
pub const DEFAULT_TOP_K: usize = 5;

fn default_user() -> String {
    "anonymous".to_string()
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("`{field}` must not be empty")));
    }
    Ok(())
}

// --- /suggest ---

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub prompt: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub id: i64,
    pub suggestion: String,
    pub context_used: Vec<String>,
    pub context_count: usize,
    pub verified: bool,
}

pub async fn post_suggest(
    State(state): State<GatewayState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, ApiError> {
    require_text("prompt", &req.prompt)?;
    let draft = state.service.request_suggestion(&req.prompt, &req.user_id).await?;
    Ok(Json(SuggestResponse {
        id: draft.line.id,
        suggestion: draft.line.text,
        context_count: draft.context.len(),
        context_used: draft.context.into_iter().map(|c| c.text).collect(),
        verified: draft.line.verified,
    }))
}

// --- /edit ---

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub llm_proposed: Option<String>,
    pub final_text: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub id: i64,
    pub suggestion: String,
    pub verified: bool,
    pub embedding_id: String,
}

pub async fn post_edit(
    State(state): State<GatewayState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    require_text("final_text", &req.final_text)?;
    let signed = state
        .service
        .edit_and_sign(req.llm_proposed.as_deref(), &req.final_text, &req.user_id)
        .await?;
    Ok(Json(EditResponse {
        id: signed.line.id,
        suggestion: signed.line.text,
        verified: signed.line.verified,
        embedding_id: signed.embedding_id,
    }))
}

// --- /verify/{line_id} ---

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: &'static str,
    pub line_id: i64,
}

pub async fn post_verify(
    State(state): State<GatewayState>,
    Path(line_id): Path<i64>,
    body: Option<Json<VerifyRequest>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let line = state
        .service
        .verify_line(line_id, req.signature.as_deref())
        .await?;
    Ok(Json(VerifyResponse {
        status: "verified",
        line_id: line.id,
    }))
}

// --- /lines ---

#[derive(Debug, Default, Deserialize)]
pub struct LinesQuery {
    #[serde(default)]
    pub verified_only: bool,
}

#[derive(Debug, Serialize)]
pub struct LineView {
    pub id: i64,
    pub line_number: i64,
    pub text: String,
    pub verified: bool,
    pub user_edited: bool,
    pub created_at: String,
}

impl From<StoryLine> for LineView {
    fn from(line: StoryLine) -> Self {
        Self {
            id: line.id,
            line_number: line.line_number,
            text: line.text,
            verified: line.verified,
            user_edited: line.user_edited,
            created_at: line.created_at,
        }
    }
}

pub async fn get_lines(
    State(state): State<GatewayState>,
    Query(query): Query<LinesQuery>,
) -> Result<Json<Vec<LineView>>, ApiError> {
    let lines = state.service.list_lines(query.verified_only).await?;
    Ok(Json(lines.into_iter().map(LineView::from).collect()))
}

// --- /lore ---

#[derive(Debug, Deserialize)]
pub struct LoreExtractRequest {
    pub line_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoreExtractResponse {
    pub characters: Vec<LoreItem>,
    pub locations: Vec<LoreItem>,
    pub events: Vec<LoreItem>,
    pub items: Vec<LoreItem>,
    pub total_entries: usize,
}

impl From<LoreSet> for LoreExtractResponse {
    fn from(set: LoreSet) -> Self {
        Self {
            total_entries: set.total(),
            characters: set.characters,
            locations: set.locations,
            events: set.events,
            items: set.items,
        }
    }
}

pub async fn post_lore_extract(
    State(state): State<GatewayState>,
    Json(req): Json<LoreExtractRequest>,
) -> Result<Json<LoreExtractResponse>, ApiError> {
    let lore = state.service.extract_lore(&req.line_ids).await?;
    Ok(Json(lore.into()))
}

#[derive(Debug, Serialize)]
pub struct LoreView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub confidence: f64,
}

impl From<LoreEntry> for LoreView {
    fn from(entry: LoreEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            description: entry.description,
            confidence: entry.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoreAllResponse {
    pub characters: Vec<LoreView>,
    pub locations: Vec<LoreView>,
    pub events: Vec<LoreView>,
    pub items: Vec<LoreView>,
}

impl From<LoreCatalog> for LoreAllResponse {
    fn from(catalog: LoreCatalog) -> Self {
        let views = |entries: Vec<LoreEntry>| entries.into_iter().map(LoreView::from).collect();
        Self {
            characters: views(catalog.characters),
            locations: views(catalog.locations),
            events: views(catalog.events),
            items: views(catalog.items),
        }
    }
}

pub async fn get_lore_all(
    State(state): State<GatewayState>,
) -> Result<Json<LoreAllResponse>, ApiError> {
    Ok(Json(state.service.list_lore().await?.into()))
}

// --- /canonicalize, /canonical/{id} ---

#[derive(Debug, Default, Deserialize)]
pub struct CanonicalizeRequest {
    #[serde(default)]
    pub line_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CanonicalizeResponse {
    pub id: i64,
    pub title: String,
    pub full_text: String,
    pub original_lines_count: i64,
    pub created_at: String,
}

pub async fn post_canonicalize(
    State(state): State<GatewayState>,
    body: Option<Json<CanonicalizeRequest>>,
) -> Result<Json<CanonicalizeResponse>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let story = state
        .service
        .canonicalize(req.line_ids.as_deref(), req.title.as_deref())
        .await?;
    Ok(Json(CanonicalizeResponse {
        id: story.id,
        title: story.title,
        full_text: story.full_text,
        original_lines_count: story.original_lines_count,
        created_at: story.created_at,
    }))
}

pub async fn get_canonical(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<CanonicalStory>, ApiError> {
    Ok(Json(state.service.get_canonical(id).await?))
}

// --- /context/retrieve ---

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub content_type: Option<String>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub results: Vec<ContextItem>,
    pub count: usize,
}

pub async fn post_context_retrieve(
    State(state): State<GatewayState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    require_text("query", &req.query)?;
    let results = state
        .service
        .retrieve_context(&req.query, req.top_k, req.content_type.as_deref())
        .await;
    Ok(Json(RetrieveResponse {
        query: req.query,
        count: results.len(),
        results,
    }))
}

// --- /health ---

pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(state.service.health().await)
}

// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the listening loop.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use saga_agent::StoryService;
use saga_config::model::ServerConfig;
use saga_core::SagaError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<StoryService>,
}

/// All routes of the story API.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/suggest", post(handlers::post_suggest))
        .route("/edit", post(handlers::post_edit))
        .route("/verify/{line_id}", post(handlers::post_verify))
        .route("/lines", get(handlers::get_lines))
        .route("/lore/extract", post(handlers::post_lore_extract))
        .route("/lore/all", get(handlers::get_lore_all))
        .route("/canonicalize", post(handlers::post_canonicalize))
        .route("/canonical/{id}", get(handlers::get_canonical))
        .route("/context/retrieve", post(handlers::post_context_retrieve))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until `cancel` fires, then drains in-flight requests.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SagaError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SagaError::Internal(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "story API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| SagaError::Internal(format!("server error: {e}")))?;

    info!("story API stopped");
    Ok(())
}

//! HTTP routes — the consumer-facing read API.
//!
//! Three resources, all read-only: workspace summaries, one workspace in
//! detail, and a ready workspace's app endpoints. Writes happen through the
//! CLI; the console never mutates the store.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use atelier_common::WorkspaceSummary;

use crate::state::AppState;

/// Build the router with all API routes and middleware layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/workspaces", get(list_workspaces))
        .route("/v1/workspaces/{id}", get(get_workspace))
        .route("/v1/workspaces/{id}/apps", get(list_apps))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Minimal health-check handler for Docker / load-balancer probes.
async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_workspaces(State(state): State<Arc<AppState>>) -> Response {
    match state.list().await {
        Ok(records) => {
            let summaries: Vec<WorkspaceSummary> =
                records.iter().map(WorkspaceSummary::from).collect();
            Json(summaries).into_response()
        }
        Err(err) => internal_error(&err),
    }
}

async fn get_workspace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.load(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => not_found(&id),
        Err(err) => internal_error(&err),
    }
}

async fn list_apps(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.load(&id).await {
        Ok(Some(record)) => Json(record.apps).into_response(),
        Ok(None) => not_found(&id),
        Err(err) => internal_error(&err),
    }
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": true,
            "message": format!("workspace {id} not found"),
        })),
    )
        .into_response()
}

fn internal_error(err: &anyhow::Error) -> Response {
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": true,
            "message": "internal error",
        })),
    )
        .into_response()
}

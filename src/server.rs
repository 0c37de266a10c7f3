//! HTTP routes for the repository API.

use crate::error::ApiError;
use crate::metrics::{METRICS, RequestMetrics};
use crate::model::{Repository, RepositoryId};
use crate::state::AppState;
use crate::validation;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::Value;
use std::sync::Arc;

pub const REPOSITORIES_PATH: &str = "/repositories";

/// Routes for the five repository operations, bound to `state`.
pub fn repository_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            REPOSITORIES_PATH,
            get(list_repositories).post(create_repository),
        )
        .route(
            "/repositories/{id}",
            put(update_repository).delete(delete_repository),
        )
        .route("/repositories/{id}/like", post(like_repository))
        .with_state(state)
}

async fn list_repositories(State(state): State<Arc<AppState>>) -> Json<Vec<Repository>> {
    let metrics = RequestMetrics::new("list");
    let repositories = state.store().list();
    metrics.success();
    Json(repositories)
}

async fn create_repository(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Repository>, ApiError> {
    let metrics = RequestMetrics::new("create");
    let result = decode_body(&body)
        .and_then(|body| validation::parse_create(&body).map_err(ApiError::from))
        .map(|new| state.store().create(new));
    observe(&state, metrics, result).map(Json)
}

async fn update_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Repository>, ApiError> {
    let metrics = RequestMetrics::new("update");
    let result = decode_body(&body)
        .and_then(|body| validation::parse_update(&body).map_err(ApiError::from))
        .and_then(|changes| {
            let id = lookup_id(&id)?;
            Ok(state.store().update(&id, changes)?)
        });
    observe(&state, metrics, result).map(Json)
}

async fn delete_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let metrics = RequestMetrics::new("delete");
    let result = lookup_id(&id).and_then(|id| Ok(state.store().delete(&id)?));
    observe(&state, metrics, result).map(|_| StatusCode::NO_CONTENT)
}

async fn like_repository(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Repository>, ApiError> {
    let metrics = RequestMetrics::new("like");
    let result = lookup_id(&id).and_then(|id| Ok(state.store().like(&id)?));
    observe(&state, metrics, result).map(Json)
}

/// An empty body counts as `{}`; anything else must be JSON.
fn decode_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Ids the store could not have issued are reported as not found.
fn lookup_id(raw: &str) -> Result<RepositoryId, ApiError> {
    RepositoryId::parse(raw).ok_or_else(|| ApiError::not_found(raw))
}

fn observe<T>(
    state: &AppState,
    metrics: RequestMetrics,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    match &result {
        Ok(_) => metrics.success(),
        Err(_) => metrics.error(),
    }
    METRICS.set_repository_count(state.store().len());
    result
}

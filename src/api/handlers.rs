use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{RecommendationOutcome, RunStatus},
    services::{processor::phase, recommendations},
};

use super::AppState;

static PLAYLIST_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"list=([a-zA-Z0-9_-]+)").expect("valid regex"));
static PLAYLIST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));

/// Playlist id from a playlist URL (`...?list=<id>`) or a bare id
pub fn extract_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = PLAYLIST_PARAM.captures(input) {
        return Some(caps[1].to_string());
    }
    if PLAYLIST_ID.is_match(input) {
        return Some(input.to_string());
    }
    None
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub playlist_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: String,
    pub total_items: usize,
    pub original_count: usize,
    pub limited: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub ingredients: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Unreadable request bodies are reported in the usual `{"error": ...}` shape
fn body_or_invalid<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

/// Resolves the playlist and starts a background run over its items
pub async fn start_run(
    State(state): State<AppState>,
    payload: Result<Json<StartRunRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<StartRunResponse>)> {
    let request = body_or_invalid(payload)?;
    if request.playlist_url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter a playlist URL".to_string(),
        ));
    }

    let playlist_id = extract_playlist_id(&request.playlist_url)
        .ok_or_else(|| AppError::InvalidInput("Invalid playlist URL".to_string()))?;

    let items = state
        .playlists
        .list_items(&playlist_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::InvalidInput("Could not load playlist".to_string()),
            other => other,
        })?;
    if items.is_empty() {
        return Err(AppError::InvalidInput(
            "No videos found in playlist".to_string(),
        ));
    }

    let original_count = items.len();
    let total_items = original_count.min(state.runner.max_items());
    let run_id = Uuid::new_v4().to_string();

    state
        .status
        .update(&run_id, 0, total_items, phase::PREPARING, "")
        .await;
    state.runner.spawn(run_id.clone(), items);

    tracing::info!(
        run_id = %run_id,
        playlist_id = %playlist_id,
        original_count,
        total_items,
        "Run accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id,
            total_items,
            original_count,
            limited: original_count > total_items,
        }),
    ))
}

/// Latest progress for a run; unknown ids read as not yet started
pub async fn get_run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Json<RunStatus> {
    let status = state
        .status
        .get(&run_id)
        .await
        .unwrap_or_else(RunStatus::pending);
    Json(status)
}

pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<RecommendationOutcome>> {
    let request = body_or_invalid(payload)?;
    let outcome = recommendations::recommend(state.store.as_ref(), &request.ingredients).await;
    Ok(Json(outcome))
}

pub async fn recipe_count(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let count = state.store.count().await?;
    Ok(Json(json!({ "count": count })))
}

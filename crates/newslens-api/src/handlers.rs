//! Route handler functions.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use newslens_core::config::MAX_TOP_K;
use newslens_core::types::{SearchQuery, SearchResult};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Body of `POST /search`. Missing fields are reported as 400s by the
/// handler rather than by the JSON extractor.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub top_k: Option<i64>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_time: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// POST /search
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = to_query(req, &state)?;

    let outcome = state.search.search(&query).await?;

    Ok(Json(SearchResponse {
        results: outcome.results,
        cached: outcome.cached,
        inference_time: outcome.inference_time,
    }))
}

fn to_query(req: SearchRequest, state: &AppState) -> Result<SearchQuery, ApiError> {
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("Missing field: user_id".into()))?;
    let text = req
        .text
        .ok_or_else(|| ApiError::BadRequest("Missing field: text".into()))?;

    let top_k = match req.top_k {
        None => state.config.search.default_top_k,
        Some(k) => usize::try_from(k)
            .ok()
            .filter(|k| (1..=MAX_TOP_K).contains(k))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("top_k must be between 1 and {}", MAX_TOP_K))
            })?,
    };

    Ok(SearchQuery {
        user_id,
        text,
        top_k,
        threshold: req.threshold.unwrap_or(state.config.search.default_threshold),
    })
}

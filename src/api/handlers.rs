use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{SearchResponse, ShowRequest},
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommends shows for a free-text description
pub async fn search_shows(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ShowRequest>, JsonRejection>,
) -> AppResult<Json<SearchResponse>> {
    // Malformed bodies get the same `detail` shape as every other error
    let Json(request) = payload?;

    tracing::info!(
        request_id = %request_id,
        description_len = request.description.len(),
        "Processing show search request"
    );

    let outcome = state.pipeline.search(&request.description).await?;
    let response = SearchResponse::from(outcome);

    tracing::info!(
        request_id = %request_id,
        results = response.results.len(),
        fallback = response.message.is_some(),
        "Show search completed"
    );

    Ok(Json(response))
}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AppState, InsightQuestionRequest, InsightsResponse, TextResponse};
use crate::routes::require_user;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/{id}/insights", get(get_insights))
        .route("/api/users/{id}/insights/ask", post(ask_insight))
        .with_state(state)
}

async fn get_insights(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<InsightsResponse>> {
    require_user(&state, user_id).await?;
    let (text, findings) = state
        .dispatcher
        .specialists()
        .pattern
        .analyze_with_findings(user_id)
        .await;
    Ok(Json(InsightsResponse { text, findings }))
}

async fn ask_insight(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<InsightQuestionRequest>,
) -> AppResult<Json<TextResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    require_user(&state, user_id).await?;

    let text = state
        .dispatcher
        .specialists()
        .pattern
        .get_specific_insight(user_id, &request.question)
        .await;
    Ok(Json(TextResponse { text }))
}

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;
use validator::Validate;

use crate::models::{AppState, ChatRequest, ChatResponse};
use crate::routes::require_user;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .with_state(state)
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    require_user(&state, request.user_id).await?;

    info!(user_id = %request.user_id, message_len = request.message.len(), "Received chat message");
    let reply = state.dispatcher.respond(request.user_id, &request.message).await;
    info!(
        user_id = %request.user_id,
        route = ?reply.route,
        coordinated = reply.coordinated,
        logged = reply.logged.len(),
        "Chat response sent"
    );

    Ok(Json(reply.into()))
}

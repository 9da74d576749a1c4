use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::info;
use validator::Validate;

use crate::models::{AppState, CreateUserRequest, User};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .with_state(state)
}

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("name must not be blank".to_string()));
    }

    let user = state.store.create_user(name, request.is_demo).await?;
    info!(user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::models::{AppState, SummaryQuery, TextResponse};
use crate::routes::require_user;
use crate::types::{AppError, AppResult};

const DEFAULT_GLUCOSE_DAYS: i64 = 7;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/{id}/summary/{kind}", get(get_summary))
        .with_state(state)
}

async fn get_summary(
    State(state): State<AppState>,
    Path((user_id, kind)): Path<(Uuid, String)>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<TextResponse>> {
    require_user(&state, user_id).await?;
    let specialists = state.dispatcher.specialists();

    let text = match kind.as_str() {
        "glucose" => {
            let days = query.days.unwrap_or(DEFAULT_GLUCOSE_DAYS);
            if !(1..=365).contains(&days) {
                return Err(AppError::InvalidRequest("days must be between 1 and 365".to_string()));
            }
            specialists.diabetes.glucose_summary(user_id, days).await?
        }
        "fitness" => specialists.fitness.weekly_summary(user_id).await?,
        "nutrition" => specialists.nutrition.daily_summary(user_id).await?,
        other => return Err(AppError::NotFound(format!("unknown summary '{other}'"))),
    };

    Ok(Json(TextResponse { text }))
}

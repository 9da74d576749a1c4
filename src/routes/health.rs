use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            "unavailable".to_string()
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
    })
}

//! API Routes
//!
//! HTTP endpoints for the assistant:
//! - `/api/chat` - Chat dispatch (log, coordinate or route)
//! - `/api/users` - Create and list users
//! - `/api/users/{id}/insights` - Pattern analysis and follow-up questions
//! - `/api/users/{id}/summary/{kind}` - Glucose, fitness and nutrition summaries
//! - `/api/health` - Health checks

pub mod chat;
pub mod health;
pub mod insights;
pub mod summary;
pub mod users;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::middleware::{cors_layer, rate_limiter_middleware};
use crate::models::{AppState, User};
use crate::types::{AppError, AppResult};

/// Create the main application router
///
/// Every route is rate limited globally; CORS and request tracing wrap the whole tree.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let api_router = Router::new()
        .merge(chat::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(insights::router(state.clone()))
        .merge(summary::router(state.clone()))
        .merge(health::router(state.clone()));

    api_router
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limiter_middleware,
        ))
        .layer(cors_layer(&state.config.server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// The user behind a path or body id, or 404
pub(crate) async fn require_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
}

// Global request rate limit backed by governor

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultDirectRateLimiter, Quota,
};
use tracing::warn;

pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
}

impl RateLimiter {
    /// A zero limit is raised to one request per minute
    pub fn per_minute(requests: u32) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: DefaultDirectRateLimiter::direct(Quota::per_minute(requests)),
            clock: DefaultClock::default(),
        }
    }

    /// `Err` carries the whole seconds to wait before retrying
    pub fn check(&self) -> Result<(), u64> {
        self.limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs().max(1)
        })
    }
}

pub async fn rate_limiter_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!(path = %req.uri().path(), retry_after, "Rate limit exceeded");
            let body = Json(serde_json::json!({
                "error": format!("Too many requests. Retry after {retry_after} seconds."),
            }));
            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

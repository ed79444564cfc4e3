use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::rate_limiter::RateLimiter;
use crate::config::rate_limits::RateAction;
use crate::http::{AppError, AuthUser};
use crate::AppState;

/// Per-user quotas on message sends and match requests. A no-op when no
/// Redis is configured.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let action = match (request.method(), request.uri().path()) {
        (&Method::POST, "/messages") => Some(RateAction::Message),
        (&Method::POST, "/matches") => Some(RateAction::MatchRequest),
        _ => None,
    };

    let (Some(action), Some(auth_user), Some(cache)) = (action, auth, state.cache.clone()) else {
        return Ok(next.run(request).await);
    };

    let rate_limiter = RateLimiter::new(cache, state.rate_limits);
    let info = rate_limiter
        .hit(auth_user.user_id, action)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to check rate limit");
            AppError::internal("failed to check rate limit")
        })?;

    if info.limited {
        tracing::warn!(
            user_id = %auth_user.user_id,
            action = action.as_str(),
            "rate limit exceeded"
        );
        return Err(AppError::rate_limited(format!(
            "Rate limit exceeded for action: {}. Please try again later.",
            action.as_str()
        )));
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
    Ok(response)
}

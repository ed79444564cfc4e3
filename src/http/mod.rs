use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod middleware;
mod routes;

pub use auth::{AuthUser, ModeratorUser};
pub use error::AppError;
pub use extract::JsonBody;

pub fn router(state: AppState) -> Router {
    let body_limit = state.request_body_limit_bytes;

    Router::new()
        .merge(routes::health())
        .merge(routes::matches())
        .merge(routes::messages())
        .merge(routes::moderation())
        .merge(routes::conversations())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}

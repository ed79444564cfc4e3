use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn matches() -> Router<AppState> {
    Router::new()
        .route(
            "/matches",
            post(handlers::create_match).get(handlers::list_matches),
        )
        .route(
            "/matches/:id",
            get(handlers::get_match).patch(handlers::update_match_status),
        )
        .route("/matches/:id/partner", get(handlers::get_match_partner))
}

pub fn messages() -> Router<AppState> {
    Router::new()
        .route(
            "/messages",
            post(handlers::send_message).get(handlers::list_messages),
        )
        .route("/messages/unread-count", get(handlers::unread_count))
        .route("/messages/:id/read", post(handlers::mark_message_read))
        .route(
            "/messages/:id",
            axum::routing::delete(handlers::delete_message),
        )
}

pub fn moderation() -> Router<AppState> {
    Router::new()
        .route("/moderation/messages", get(handlers::list_pending_messages))
        .route(
            "/moderation/messages/:id/resolve",
            post(handlers::resolve_message),
        )
}

pub fn conversations() -> Router<AppState> {
    Router::new().route("/conversations", get(handlers::list_conversations))
}

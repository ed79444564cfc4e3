use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::conversations::ConversationAggregator;
use crate::app::matches::MatchService;
use crate::app::messages::{ListMessages, MessageService, SendMessage};
use crate::app::moderation::ModerationQueue;
use crate::app::unread::UnreadCounter;
use crate::domain::conversation::{Conversation, PartnerView};
use crate::domain::matching::Match;
use crate::domain::message::Message;
use crate::http::{AppError, AuthUser, JsonBody, ModeratorUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn parse_pagination(limit: Option<i64>, offset: Option<i64>) -> Result<(i64, i64), AppError> {
    let limit = limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::bad_request("offset must not be negative"));
    }
    Ok((limit, offset))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.stores.ping().await.is_ok();
    let redis = match &state.cache {
        Some(cache) => cache.ping().await.is_ok(),
        None => true,
    };
    let status = if store && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct CreateMatchRequest {
    pub partner_id: Option<Uuid>,
}

pub async fn create_match(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateMatchRequest>,
) -> Result<(StatusCode, Json<Match>), AppError> {
    let service = MatchService::new(state.stores.clone());
    let (record, created) = service
        .create_match(auth.user_id, auth.role, payload.partner_id)
        .await
        .map_err(|err| AppError::from_service(err, "create match"))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(record)))
}

#[derive(Deserialize)]
pub struct ListMatchesQuery {
    pub status: Option<String>,
}

pub async fn list_matches(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<Vec<Match>>, AppError> {
    let service = MatchService::new(state.stores.clone());
    let matches = service
        .list_for_user(auth.user_id, query.status.as_deref())
        .await
        .map_err(|err| AppError::from_service(err, "list matches"))?;

    Ok(Json(matches))
}

pub async fn get_match(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Match>, AppError> {
    let service = MatchService::new(state.stores.clone());
    let record = service
        .get(id, auth.user_id, auth.role)
        .await
        .map_err(|err| AppError::from_service(err, "fetch match"))?;

    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct UpdateMatchStatusRequest {
    pub status: Option<String>,
}

pub async fn update_match_status(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateMatchStatusRequest>,
) -> Result<Json<Match>, AppError> {
    let service = MatchService::new(state.stores.clone());
    let record = service
        .update_status(id, auth.user_id, payload.status.as_deref())
        .await
        .map_err(|err| AppError::from_service(err, "update match status"))?;

    Ok(Json(record))
}

pub async fn get_match_partner(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PartnerView>, AppError> {
    let service = MatchService::new(state.stores.clone());
    let partner = service
        .partner_view(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "resolve match partner"))?;

    Ok(Json(partner))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub match_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
}

pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let service = MessageService::new(state.stores.clone(), state.messaging);
    let message = service
        .send(
            auth.user_id,
            SendMessage {
                match_id: payload.match_id,
                recipient_id: payload.recipient_id,
                content: payload.content,
                attachments: payload.attachments,
            },
        )
        .await
        .map_err(|err| AppError::from_service(err, "send message"))?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Deserialize)]
pub struct ListMessagesQuery {
    pub match_id: Option<Uuid>,
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<ListResponse<Message>>, AppError> {
    let (limit, offset) = parse_pagination(query.limit, query.offset)?;

    let service = MessageService::new(state.stores.clone(), state.messaging);
    let page = service
        .list(
            auth.user_id,
            auth.role,
            ListMessages {
                match_id: query.match_id,
                unread_only: query.unread_only.unwrap_or(false),
                limit,
                offset,
            },
        )
        .await
        .map_err(|err| AppError::from_service(err, "list messages"))?;

    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
    pub poll_interval_seconds: u64,
}

pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let counter = UnreadCounter::new(state.stores.clone());
    let count = counter
        .count_unread(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "count unread messages"))?;

    Ok(Json(UnreadCountResponse {
        count,
        poll_interval_seconds: state.unread_poll_interval_seconds,
    }))
}

pub async fn mark_message_read(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = MessageService::new(state.stores.clone(), state.messaging);
    service
        .mark_read(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "mark message read"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_message(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = MessageService::new(state.stores.clone(), state.messaging);
    service
        .delete(id, auth.user_id, auth.role)
        .await
        .map_err(|err| AppError::from_service(err, "delete message"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pending_messages(
    _moderator: ModeratorUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Message>>, AppError> {
    let (limit, offset) = parse_pagination(query.limit, query.offset)?;

    let queue = ModerationQueue::new(state.stores.clone());
    let page = queue
        .list_pending(limit, offset)
        .await
        .map_err(|err| AppError::from_service(err, "list pending messages"))?;

    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

#[derive(Deserialize)]
pub struct ResolveMessageRequest {
    pub decision: Option<String>,
    pub reason: Option<String>,
}

pub async fn resolve_message(
    Path(id): Path<Uuid>,
    moderator: ModeratorUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ResolveMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let queue = ModerationQueue::new(state.stores.clone());
    let message = queue
        .resolve(id, moderator.user_id, payload.decision.as_deref(), payload.reason)
        .await
        .map_err(|err| AppError::from_service(err, "resolve message"))?;

    Ok(Json(message))
}

pub async fn list_conversations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let aggregator = ConversationAggregator::new(state.stores.clone());
    let conversations = aggregator
        .list_conversations(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "list conversations"))?;

    Ok(Json(conversations))
}

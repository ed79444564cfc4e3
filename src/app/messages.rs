use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::Page;
use crate::domain::matching::MatchStatus;
use crate::domain::message::{Message, ModerationPolicy};
use crate::domain::user::Role;
use crate::infra::store::{MessageFilter, SortOrder, Stores};

/// Limits and policy applied to every outgoing message.
#[derive(Debug, Clone, Copy)]
pub struct MessageSettings {
    pub policy: ModerationPolicy,
    pub max_chars: usize,
    pub max_attachments: usize,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            policy: ModerationPolicy::default(),
            max_chars: 5000,
            max_attachments: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendMessage {
    pub match_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListMessages {
    pub match_id: Option<Uuid>,
    pub unread_only: bool,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct MessageService {
    stores: Stores,
    settings: MessageSettings,
}

impl MessageService {
    pub fn new(stores: Stores, settings: MessageSettings) -> Self {
        Self { stores, settings }
    }

    pub async fn send(&self, sender_id: Uuid, input: SendMessage) -> ServiceResult<Message> {
        let match_id = input
            .match_id
            .ok_or_else(|| ServiceError::invalid("match_id is required"))?;
        let recipient_id = input
            .recipient_id
            .ok_or_else(|| ServiceError::invalid("recipient_id is required"))?;
        let content = input
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ServiceError::invalid("content is required"))?;
        if content.chars().count() > self.settings.max_chars {
            return Err(ServiceError::invalid(format!(
                "content exceeds {} characters",
                self.settings.max_chars
            )));
        }
        let attachments = input.attachments.unwrap_or_default();
        if attachments.len() > self.settings.max_attachments {
            return Err(ServiceError::invalid(format!(
                "at most {} attachments allowed",
                self.settings.max_attachments
            )));
        }

        let sender = self
            .stores
            .directory
            .find_user(sender_id)
            .await?
            .ok_or_else(|| ServiceError::invalid("sender could not be resolved"))?;

        let record = self
            .stores
            .matches
            .find(match_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("match not found"))?;
        let counterpart = record
            .counterpart(sender_id)
            .ok_or_else(|| ServiceError::forbidden("not a participant in this match"))?;
        if recipient_id != counterpart {
            return Err(ServiceError::invalid(
                "recipient must be the other participant of the match",
            ));
        }
        if record.status != MatchStatus::Accepted {
            return Err(ServiceError::forbidden(
                "messages can only be sent on an accepted match",
            ));
        }
        let sender_type = sender
            .role
            .side()
            .ok_or_else(|| ServiceError::forbidden("staff accounts cannot send messages"))?;

        let now = OffsetDateTime::now_utc();
        let message = self
            .stores
            .messages
            .insert(Message {
                id: Uuid::new_v4(),
                match_id,
                sender_id,
                sender_type,
                recipient_id,
                content,
                attachments,
                read_status: false,
                moderation_status: self.settings.policy.initial_status(),
                moderation_reason: None,
                moderated_by: None,
                moderated_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        if !self.stores.matches.record_message(match_id, now).await? {
            tracing::warn!(match_id = %match_id, "match vanished before message was recorded");
        }

        tracing::info!(
            message_id = %message.id,
            match_id = %match_id,
            sender_id = %sender_id,
            moderation_status = message.moderation_status.as_db(),
            "message sent"
        );

        Ok(message)
    }

    pub async fn mark_read(&self, message_id: Uuid, requester_id: Uuid) -> ServiceResult<()> {
        let message = self.find(message_id).await?;
        if message.recipient_id != requester_id {
            return Err(ServiceError::forbidden(
                "only the recipient can mark a message as read",
            ));
        }
        if self
            .stores
            .messages
            .mark_read(message_id, OffsetDateTime::now_utc())
            .await?
        {
            tracing::debug!(message_id = %message_id, reader_id = %requester_id, "message read");
        }
        Ok(())
    }

    pub async fn delete(&self, message_id: Uuid, requester_id: Uuid, requester_role: Role) -> ServiceResult<()> {
        let message = self.find(message_id).await?;
        if message.sender_id != requester_id && !requester_role.is_staff() {
            return Err(ServiceError::forbidden(
                "only the sender or a moderator can delete this message",
            ));
        }
        if !self.stores.messages.delete(message_id).await? {
            return Err(ServiceError::not_found("message not found"));
        }
        tracing::info!(
            message_id = %message_id,
            actor_id = %requester_id,
            actor_role = requester_role.as_db(),
            "message deleted"
        );
        Ok(())
    }

    /// Messages visible to the requester, oldest first.
    pub async fn list(
        &self,
        requester_id: Uuid,
        requester_role: Role,
        query: ListMessages,
    ) -> ServiceResult<Page<Message>> {
        let mut filter = match query.match_id {
            Some(match_id) => {
                let record = self
                    .stores
                    .matches
                    .find(match_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("match not found"))?;
                if record.involves(requester_id) {
                    MessageFilter::for_match(match_id).visible_to(requester_id)
                } else if requester_role.is_staff() {
                    MessageFilter::for_match(match_id)
                } else {
                    return Err(ServiceError::forbidden("not a participant in this match"));
                }
            }
            None => MessageFilter::involving(requester_id).visible_to(requester_id),
        };

        if query.unread_only {
            let unread = MessageFilter::unread_for(requester_id);
            filter.recipient_id = unread.recipient_id;
            filter.read_status = unread.read_status;
            filter.moderation_status = unread.moderation_status;
        }

        let items = self
            .stores
            .messages
            .list(&filter, SortOrder::Ascending, query.limit, query.offset)
            .await?;
        let total = self.stores.messages.count(&filter).await?;

        Ok(Page { items, total })
    }

    async fn find(&self, message_id: Uuid) -> ServiceResult<Message> {
        self.stores
            .messages
            .find(message_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("message not found"))
    }
}

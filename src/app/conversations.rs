use futures::future::try_join_all;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::matches::resolve_partner;
use crate::app::unread::UnreadCounter;
use crate::domain::conversation::{sort_conversations, Conversation, NO_MESSAGES_PLACEHOLDER};
use crate::domain::matching::{Match, MatchStatus};
use crate::infra::store::{MatchFilter, MessageFilter, SortOrder, Stores};

/// Builds a user's inbox from their accepted matches. Nothing here is stored.
#[derive(Clone)]
pub struct ConversationAggregator {
    stores: Stores,
    unread: UnreadCounter,
}

impl ConversationAggregator {
    pub fn new(stores: Stores) -> Self {
        let unread = UnreadCounter::new(stores.clone());
        Self { stores, unread }
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> ServiceResult<Vec<Conversation>> {
        let matches = self
            .stores
            .matches
            .list(&MatchFilter {
                user_id,
                status: Some(MatchStatus::Accepted),
            })
            .await?;

        let entries = try_join_all(
            matches
                .into_iter()
                .map(|record| self.conversation_for(user_id, record)),
        )
        .await?;

        let mut conversations: Vec<Conversation> = entries.into_iter().flatten().collect();
        sort_conversations(&mut conversations);
        Ok(conversations)
    }

    async fn conversation_for(&self, user_id: Uuid, record: Match) -> ServiceResult<Option<Conversation>> {
        let Some(partner_id) = record.counterpart(user_id) else {
            return Ok(None);
        };

        let partner = match resolve_partner(&self.stores, partner_id).await {
            Ok(partner) => partner,
            Err(ServiceError::NotFound(_)) => {
                tracing::warn!(
                    match_id = %record.id,
                    partner_id = %partner_id,
                    "skipping conversation with unknown partner"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let latest = self
            .stores
            .messages
            .list(
                &MessageFilter::for_match(record.id).approved(),
                SortOrder::Descending,
                1,
                0,
            )
            .await?
            .into_iter()
            .next();

        let (last_message, last_message_date) = match latest {
            Some(message) => (message.content, message.created_at),
            None => (NO_MESSAGES_PLACEHOLDER.to_string(), record.created_at),
        };

        let unread_count = self.unread.count_unread_in_match(user_id, record.id).await?;

        Ok(Some(Conversation {
            match_id: record.id,
            partner_id,
            partner_name: partner.name,
            partner_img: partner.image,
            last_message,
            last_message_date,
            unread_count,
            status: record.status,
        }))
    }
}
